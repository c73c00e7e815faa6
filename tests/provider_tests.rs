use lmdispatch::config::BackendConfig;
use lmdispatch::error::Error;
use lmdispatch::providers::openai::{
  auth_header, chat_completions_url, classify_failure
, is_content_policy_rejection, parse_success
};
use lmdispatch::providers::{CallOutcome, HttpBackend};
use lmdispatch::request::Usage;
use lmdispatch::Provider;

const AZURE_FILTERED: &str = r#"{"error":{"message":"The response was filtered due to the prompt triggering Microsoft's content management policy. Please modify your prompt and retry.","type":null,"param":"prompt","code":"content_filter","status":400}}"#;

#[test]
fn test_content_policy_rejection_is_permanent()
{   assert!(is_content_policy_rejection(AZURE_FILTERED));
    assert!(matches!(
      classify_failure(400, AZURE_FILTERED),
      CallOutcome::PermanentRejection(_)
    ));
}

#[test]
fn test_content_filter_code_alone_is_recognised()
{   let body = r#"{"error":{"message":"blocked","code":"content_filter"}}"#;
    assert!(is_content_policy_rejection(body));
}

#[test]
fn test_other_bad_requests_are_transient()
{   let body = r#"{"error":{"message":"max_tokens is too large","code":"invalid_value"}}"#;
    assert_eq!(
      classify_failure(400, body),
      CallOutcome::TransientError(Error::ApiError
      {   status: 400
        , message: body.to_string()
      })
    );
}

#[test]
fn test_status_classification()
{   assert_eq!(
      classify_failure(429, "slow down"),
      CallOutcome::TransientError(Error::RateLimitExceeded)
    );
    assert_eq!(
      classify_failure(504, ""),
      CallOutcome::TransientError(Error::Timeout)
    );
    assert!(matches!(
      classify_failure(500, AZURE_FILTERED),
      CallOutcome::TransientError(Error::ApiError { status: 500, .. })
    ));
}

#[test]
fn test_parse_success_keeps_null_content_and_usage()
{   let body = r#"{
      "id": "chatcmpl-1",
      "choices": [
        {"index": 0, "message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"},
        {"index": 1, "message": {"role": "assistant", "content": null, "reasoning_content": "2+2"}, "finish_reason": "length"}
      ],
      "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
    }"#;
    let CallOutcome::Success(response) = parse_success(body)
    else
    {   panic!("expected success");
    };
    assert_eq!(response.choices.len(), 2);
    assert_eq!(response.choices[0].text.as_deref(), Some("4"));
    assert_eq!(response.choices[1].text, None);
    assert_eq!(response.choices[1].reasoning_content.as_deref(), Some("2+2"));
    assert_eq!(response.choices[1].finish_reason.as_deref(), Some("length"));
    assert_eq!(response.usage, Some(Usage
    {   completion_tokens: Some(12)
      , total_tokens: Some(21)
      , estimated_cost: None
    }));
}

#[test]
fn test_malformed_body_is_transient()
{   assert!(matches!(
      parse_success("<html>bad gateway</html>"),
      CallOutcome::TransientError(Error::ParseError(_))
    ));
}

#[test]
fn test_http_backend_endpoint()
{   let mut config = BackendConfig::new(Provider::Local, "qwen2.5-7b");
    config.api_base = Some("http://127.0.0.1:8000/v1/".to_string());
    config.api_key = Some("token".to_string());
    let backend = HttpBackend::new(&config).expect("backend builds");
    assert_eq!(backend.endpoint(), "http://127.0.0.1:8000/v1/chat/completions");
}

#[test]
fn test_request_body_omits_unset_fields()
{   let params = lmdispatch::request::ProviderCallParams
    {   model: "gpt-4o".to_string()
      , messages: vec![lmdispatch::request::ChatMessage::user("hi")]
      , n: 2
      , stop: vec![]
      , max_completion_tokens: Some(64)
      , max_tokens: None
      , temperature: None
      , top_p: None
      , seed: None
      , frequency_penalty: None
      , presence_penalty: None
      , logprobs: None
      , reasoning_effort: None
    };
    let body = serde_json::to_value(&params).expect("serialises");
    assert_eq!(body, serde_json::json!({
      "model": "gpt-4o",
      "messages": [{"role": "user", "content": "hi"}],
      "n": 2,
      "max_completion_tokens": 64
    }));
}

#[test]
fn test_azure_endpoint_targets_deployment()
{   let mut config = BackendConfig::new(Provider::AzureOpenAI, "azure/gpt-4o");
    config.api_base = Some("https://eval.openai.azure.com/".to_string());
    config.api_key = Some("azure-key".to_string());
    assert_eq!(
      chat_completions_url(&config).expect("url"),
      "https://eval.openai.azure.com/openai/deployments/gpt-4o\
       /chat/completions?api-version=2024-10-21"
    );

    config.api_version = Some("2025-01-01-preview".to_string());
    let backend = HttpBackend::new(&config).expect("backend builds");
    assert_eq!(
      backend.endpoint(),
      "https://eval.openai.azure.com/openai/deployments/gpt-4o\
       /chat/completions?api-version=2025-01-01-preview"
    );

    config.api_base = Some(
      "https://eval.openai.azure.com/openai/deployments/prod-4o".to_string()
    );
    assert_eq!(
      chat_completions_url(&config).expect("url"),
      "https://eval.openai.azure.com/openai/deployments/prod-4o\
       /chat/completions?api-version=2025-01-01-preview"
    );
}

#[test]
fn test_azure_without_base_is_rejected()
{   let config = BackendConfig::new(Provider::AzureOpenAI, "gpt-4o");
    assert!(matches!(
      chat_completions_url(&config),
      Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_auth_header_per_provider()
{   assert_eq!(
      auth_header(Provider::AzureOpenAI, "k1"),
      ("api-key", "k1".to_string())
    );
    for provider in [
      Provider::OpenAI
    , Provider::MistralAi
    , Provider::Proxy
    , Provider::Local
    ]
    {   assert_eq!(
          auth_header(provider, "k2"),
          ("Authorization", "Bearer k2".to_string())
        );
    }
}
