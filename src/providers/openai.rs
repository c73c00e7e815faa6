use std::time::Duration;

use serde::Deserialize;
use log::{debug, trace, error, warn};

use crate::config::BackendConfig;
use crate::error::Error;
use crate::providers::{CallOutcome, CompletionBackend};
use crate::request::{Candidate, ProviderCallParams, RawResponse, Usage};
use crate::{Provider, ProviderIdentity};

/// Azure's content management filter
const CONTENT_POLICY_SIGNATURE: &str
  = "The response was filtered due to the prompt triggering \
     Microsoft's content management policy";
/// OpenAI-style error code for the same rejection
const CONTENT_FILTER_CODE: &str = "content_filter";

// ===== Wire Types =====

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<WireUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: WireMessage
  , #[serde(default)]
    pub finish_reason: Option<String>
  , #[serde(default)]
    pub logprobs: Option<serde_json::Value>
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage
{   #[serde(default)]
    pub content: Option<String>
  , #[serde(default, alias = "reasoning")]
    pub reasoning_content: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUsage
{   #[serde(default)]
    pub completion_tokens: Option<u64>
  , #[serde(default)]
    pub total_tokens: Option<u64>
  , #[serde(default, alias = "cost")]
    pub estimated_cost: Option<f64>
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope
{   error: ErrorBody
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody
{   #[serde(default)]
    message: Option<String>
  , #[serde(default)]
    code: Option<serde_json::Value>
}

impl From<ChatCompletionResponse> for RawResponse
{   fn from(wire: ChatCompletionResponse) -> Self
    {   RawResponse
        {   choices: wire.choices
              .into_iter()
              .map(|c| Candidate
                {   text: c.message.content
                  , reasoning_content: c.message.reasoning_content
                  , logprobs: c.logprobs
                  , finish_reason: c.finish_reason
                })
              .collect()
          , usage: wire.usage.map(|u| Usage
              {   completion_tokens: u.completion_tokens
                , total_tokens: u.total_tokens
                , estimated_cost: u.estimated_cost
              })
        }
    }
}

// ===== Classification =====

/// True when an error body carries a content-policy refusal.
pub fn is_content_policy_rejection(body: &str) -> bool
{   if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body)
    {   let code_matches = envelope.error.code
          .as_ref()
          .and_then(|c| c.as_str())
          .map(|c| c == CONTENT_FILTER_CODE)
          .unwrap_or(false);
        let message_matches = envelope.error.message
          .as_deref()
          .map(|m| m.contains(CONTENT_POLICY_SIGNATURE))
          .unwrap_or(false);
        if code_matches || message_matches
        {   return true;
        }
    }
    body.contains(CONTENT_POLICY_SIGNATURE)
}

/// Map a non-success status and its body to an outcome.
/// Bad requests other than policy refusals are retried like any
/// other failure.
pub fn classify_failure(status: u16, body: &str) -> CallOutcome
{   if status == 400 && is_content_policy_rejection(body)
    {   return CallOutcome::PermanentRejection(body.to_string());
    }
    if status == 429
    {   return CallOutcome::TransientError(Error::RateLimitExceeded);
    }
    if status == 408 || status == 504
    {   return CallOutcome::TransientError(Error::Timeout);
    }
    CallOutcome::TransientError(Error::ApiError
    {   status
      , message: body.to_string()
    })
}

/// Parse a success body.
pub fn parse_success(body: &str) -> CallOutcome
{   match serde_json::from_str::<ChatCompletionResponse>(body)
    {   Ok(wire) => CallOutcome::Success(wire.into())
      , Err(e) => {
          error!("Parse error: {}", e);
          CallOutcome::TransientError(Error::ParseError(e.to_string()))
        }
    }
}

// ===== Endpoint and Auth =====

/// Full chat-completions URL for a backend.
///
/// Azure routes by deployment, `{base}/openai/deployments/{model}`, and
/// requires an `api-version` query. A base that already names a
/// deployment is used as is.
pub fn chat_completions_url(config: &BackendConfig) -> Result<String, Error>
{   let base = config.resolve_api_base()?;
    match config.provider
    {   Provider::AzureOpenAI => {
          let identity = ProviderIdentity::new(
            config.provider
          , config.model.clone()
          );
          let deployment_base = if base.contains("/deployments/")
          {   base
          } else
          {   format!(
              "{}/openai/deployments/{}",
              base.trim_end_matches("/openai"),
              identity.model_name()
            )
          };
          Ok(format!(
            "{}/chat/completions?api-version={}",
            deployment_base,
            config.resolve_api_version()
          ))
        }
      , _ => Ok(format!("{}/chat/completions", base))
    }
}

/// Header name and value carrying the key: Azure wants `api-key`,
/// everyone else a bearer token.
pub fn auth_header(provider: Provider, key: &str) -> (&'static str, String)
{   match provider
    {   Provider::AzureOpenAI => ("api-key", key.to_string())
      , _ => ("Authorization", format!("Bearer {}", key))
    }
}

// ===== HTTP Backend =====

/// OpenAI-compatible `/chat/completions` client
#[derive(Debug, Clone)]
pub struct HttpBackend
{   endpoint: String
  , auth: Option<(&'static str, String)>
  , http_client: reqwest::Client
}

impl HttpBackend
{   pub fn new(config: &BackendConfig) -> Result<Self, Error>
    {   debug!("Creating HttpBackend for {:?}", config.provider);
        let endpoint = chat_completions_url(config)?;
        let api_key = config.resolve_api_key();
        if api_key.is_none()
        {   warn!(
              "No API key for {:?}; sending unauthenticated requests",
              config.provider
            );
        }
        let timeout = Duration::from_secs(
          config.timeout_secs
            .unwrap_or(BackendConfig::DEFAULT_TIMEOUT_SECS)
        );
        let http_client = reqwest::Client::builder()
          .timeout(timeout)
          .build()
          .map_err(|e| Error::HttpError(e.to_string()))?;

        Ok(HttpBackend
        {   endpoint
          , auth: api_key
              .as_deref()
              .map(|key| auth_header(config.provider, key))
          , http_client
        })
    }

    pub fn endpoint(&self) -> &str
    {   &self.endpoint
    }

    async fn send(&self, params: &ProviderCallParams) -> CallOutcome
    {   trace!("Chat request: {:?}", params);

        let mut request = self.http_client
          .post(&self.endpoint)
          .header("Content-Type", "application/json")
          .json(params);
        if let Some((name, value)) = &self.auth
        {   request = request.header(*name, value.as_str());
        }

        let response = match request.send().await
        {   Ok(response) => response
          , Err(e) if e.is_timeout() => {
              error!("HTTP timeout: {}", e);
              return CallOutcome::TransientError(Error::Timeout);
            }
          , Err(e) => {
              error!("HTTP error: {}", e);
              return CallOutcome::TransientError(
                Error::HttpError(e.to_string())
              );
            }
        };

        let status = response.status();
        trace!("Chat response status: {}", status);

        let body = match response.text().await
        {   Ok(body) => body
          , Err(e) => {
              error!("Failed to read body: {}", e);
              return CallOutcome::TransientError(
                Error::HttpError(e.to_string())
              );
            }
        };

        if !status.is_success()
        {   error!("API error {}: {}", status, body);
            return classify_failure(status.as_u16(), &body);
        }
        parse_success(&body)
    }
}

impl CompletionBackend for HttpBackend
{   async fn complete(&self, params: &ProviderCallParams) -> CallOutcome
    {   self.send(params).await
    }
}
