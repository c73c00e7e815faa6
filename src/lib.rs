pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod reasoning;
pub mod retry;
pub mod shaper;
pub mod executor;
pub mod multiplex;
pub mod dispatch;
pub mod conversation;
pub mod engine;
use serde::{Deserialize, Serialize};

/*

lmdispatch turns batches of evaluation prompts into completed model
responses against remote, rate-limited LLM backends. prompts come in
already formatted, responses go out as plain text lists; building the
prompts and scoring the answers happens elsewhere.

lmdispatch/
├── src/
│   ├── lib.rs          # Provider identity and re-exports
│   ├── error.rs        # Error enum
│   ├── config.rs       # DispatchConfig and loaders
│   ├── request.rs      # Requests, raw/merged responses, result records
│   ├── reasoning.rs    # Reasoning-content extraction strategies
│   ├── retry.rs        # Backoff schedule
│   ├── shaper.rs       # LogicalRequest -> ProviderCallParams
│   ├── executor.rs     # One call, bounded retries
│   ├── multiplex.rs    # n > cap decomposition and merge
│   ├── dispatch.rs     # Bounded worker pool over a batch
│   ├── conversation.rs # Sequential multi-turn driver
│   ├── engine.rs       # Facade wiring the above from config
│   └── providers/
│       ├── mod.rs      # CompletionBackend trait, CallOutcome
│       └── openai.rs   # OpenAI-compatible chat completions over HTTP
└── tests/

caller -> shaper -> (multiplexer . executor) -> dispatcher | driver -> caller

*/

pub use config::{BackendConfig, DispatchConfig, GenerationParameters, RetryConfig};
pub use conversation::ConversationDriver;
pub use dispatch::ConcurrencyDispatcher;
pub use engine::DispatchEngine;
pub use error::Error;
pub use executor::{Pause, SingleCallExecutor, TokioPause};
pub use multiplex::SampleMultiplexer;
pub use providers::{CallOutcome, CompletionBackend};
pub use reasoning::ReasoningStrategy;
pub use request::{
  Candidate, ChatMessage, Conversation, GenerativeResponse, LogicalRequest
, MultiTurnResponse, ProviderCallParams, RawResponse, Role, Usage
};
pub use retry::RetryPolicy;
pub use shaper::{RequestShaper, ShapedCall};

/// Backend families the dispatch engine knows how to shape requests for.
/// All of them are reached through an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provider
{
  /// OpenAI (GPT, o-series)
  #[serde(rename = "openai")]
  OpenAI
  ,
  /// Azure OpenAI deployments (content-management filtered)
  #[serde(rename = "azure")]
  AzureOpenAI
  ,
  /// Anthropic (Claude models, compatibility endpoint)
  Anthropic
  ,
  /// Mistral AI
  #[serde(rename = "mistral")]
  MistralAi
  ,
  /// Google (Gemini, compatibility endpoint)
  #[serde(rename = "gemini")]
  Google
  ,
  /// LiteLLM / OpenRouter style proxies
  Proxy
  ,
  /// Local/self-hosted servers (vLLM, Ollama, LM Studio)
  Local
}

impl Provider
{   /// Parse a provider name as found in config files and
    /// `provider/model` strings.
    pub fn from_name(name: &str) -> Option<Self>
    {   match name.trim().to_ascii_lowercase().as_str()
        {   "openai" => Some(Provider::OpenAI)
          , "azure" | "azure_openai" => Some(Provider::AzureOpenAI)
          , "anthropic" => Some(Provider::Anthropic)
          , "mistral" | "mistralai" => Some(Provider::MistralAi)
          , "gemini" | "google" => Some(Provider::Google)
          , "proxy" | "litellm" | "openrouter" => Some(Provider::Proxy)
          , "local" | "vllm" | "ollama" | "hosted_vllm" => Some(Provider::Local)
          , _ => None
        }
    }

    /// Public endpoint used when no base URL is configured.
    pub fn default_api_base(&self) -> Option<&'static str>
    {   match self
        {   Provider::OpenAI => Some("https://api.openai.com/v1")
          , Provider::Anthropic => Some("https://api.anthropic.com/v1")
          , Provider::MistralAi => Some("https://api.mistral.ai/v1")
          , Provider::Google => Some(
              "https://generativelanguage.googleapis.com/v1beta/openai"
            )
          , Provider::Local => Some("http://localhost:8000/v1")
          , Provider::AzureOpenAI | Provider::Proxy => None
        }
    }

    /// Whether the token budget goes out as the legacy `max_tokens`
    /// field rather than `max_completion_tokens`.
    pub fn uses_max_tokens_field(&self) -> bool
    {   match self
        {   Provider::OpenAI | Provider::AzureOpenAI => false
          , Provider::Anthropic
          | Provider::MistralAi
          | Provider::Google
          | Provider::Proxy
          | Provider::Local => true
        }
    }

    /// Conventional environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str
    {   match self
        {   Provider::OpenAI => "OPENAI_API_KEY"
          , Provider::AzureOpenAI => "AZURE_API_KEY"
          , Provider::Anthropic => "ANTHROPIC_API_KEY"
          , Provider::MistralAi => "MISTRAL_API_KEY"
          , Provider::Google => "GEMINI_API_KEY"
          , Provider::Proxy => "LITELLM_API_KEY"
          , Provider::Local => "LOCAL_API_KEY"
        }
    }
}

/// Target of a dispatch: a backend family plus the model string
/// sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Hash)]
pub struct ProviderIdentity
{   pub provider: Provider
  , pub model: String
}

impl ProviderIdentity
{   pub fn new(provider: Provider, model: impl Into<String>) -> Self
    {   ProviderIdentity
        {   provider
          , model: model.into()
        }
    }

    /// Model name without any `provider/` routing prefix.
    pub fn model_name(&self) -> &str
    {   self.model.rsplit('/').next().unwrap_or(&self.model)
    }

    /// Model string sent on the wire. Only proxies route on the
    /// `provider/` prefix; first-party APIs want the bare name.
    pub fn wire_model(&self) -> &str
    {   match self.provider
        {   Provider::Proxy => &self.model
          , _ => self.model_name()
        }
    }

    /// o-series models (`o1`, `o3-mini`, `o4-mini-2025-04-16`, ...)
    /// spend hidden reasoning tokens before answering.
    pub fn is_reasoning_family(&self) -> bool
    {   let name = self.model_name().as_bytes();
        name.len() >= 2
          && name[0].eq_ignore_ascii_case(&b'o')
          && name[1].is_ascii_digit()
          && (name.len() == 2 || name[2] == b'-')
    }
}
