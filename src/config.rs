//! Configuration for the dispatch engine
//!
//! Built once, validated, then moved into the engine. Nothing here is
//! read again after construction.

use std::path::Path;

use serde::{Deserialize, Serialize};
use log::{debug, warn};

use crate::error::Error;
use crate::reasoning::ReasoningStrategy;
use crate::Provider;

const ENV_CONCURRENT_CALLS: &str = "LMDISPATCH_CONCURRENT_CALLS";
const ENV_PROVIDER: &str = "LMDISPATCH_PROVIDER";
const ENV_MODEL: &str = "LMDISPATCH_MODEL";
const ENV_BASE_URL: &str = "LMDISPATCH_BASE_URL";
const ENV_API_KEY: &str = "LMDISPATCH_API_KEY";
const ENV_MAX_N: &str = "LMDISPATCH_MAX_N";
const ENV_API_VERSION: &str = "LMDISPATCH_API_VERSION";

/// Backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig
{   /// Backend family
    pub provider: Provider
  , /// Model string sent on the wire
    pub model: String
  , /// API base URL (if custom)
    #[serde(default)]
    pub api_base: Option<String>
  , /// API key; falls back to the provider's usual env var
    #[serde(default)]
    pub api_key: Option<String>
  , /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>
  , /// Largest `n` one call may request; unset means unbounded
    #[serde(default)]
    pub max_n: Option<u32>
  , /// `api-version` query parameter; Azure only
    #[serde(default)]
    pub api_version: Option<String>
}

impl BackendConfig
{   pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
    pub const DEFAULT_AZURE_API_VERSION: &'static str = "2024-10-21";

    pub fn new(provider: Provider, model: impl Into<String>) -> Self
    {   BackendConfig
        {   provider
          , model: model.into()
          , api_base: None
          , api_key: None
          , timeout_secs: None
          , max_n: None
          , api_version: None
        }
    }

    /// Configured key, else the provider's conventional env var.
    pub fn resolve_api_key(&self) -> Option<String>
    {   self.api_key
          .clone()
          .or_else(|| std::env::var(self.provider.api_key_env()).ok())
    }

    /// Configured `api-version`, else the pinned Azure default.
    pub fn resolve_api_version(&self) -> &str
    {   self.api_version
          .as_deref()
          .unwrap_or(Self::DEFAULT_AZURE_API_VERSION)
    }

    /// Configured base URL, else the provider's public endpoint.
    pub fn resolve_api_base(&self) -> Result<String, Error>
    {   self.api_base
          .clone()
          .or_else(|| {
            self.provider.default_api_base().map(str::to_string)
          })
          .map(|base| base.trim_end_matches('/').to_string())
          .ok_or_else(|| {
            Error::InvalidConfiguration(format!(
              "{:?} requires an explicit api_base",
              self.provider
            ))
          })
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Attempts per provider call, first one included
    pub max_attempts: usize
  , /// Sleep before the second attempt, in seconds
    pub base_sleep_secs: f64
  , /// Growth factor between consecutive sleeps
    pub multiplier: f64
  , /// Upper bound on a single sleep, in seconds
    pub max_wait_secs: f64
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 5
          , base_sleep_secs: 3.0
          , multiplier: 2.0
          , max_wait_secs: 64.0
        }
    }
}

/// Deployment-wide sampling defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters
{   pub temperature: Option<f32>
  , pub top_p: Option<f32>
  , pub seed: Option<u64>
  , pub frequency_penalty: Option<f32>
  , pub presence_penalty: Option<f32>
  , /// Forwarded to reasoning-family models only
    pub reasoning_effort: Option<String>
}

/// Dispatch engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig
{   pub backend: BackendConfig
  , #[serde(default)]
    pub retry: RetryConfig
  , /// Ceiling on simultaneous provider calls
    #[serde(default = "default_concurrency_budget")]
    pub concurrency_budget: usize
  , #[serde(default)]
    pub generation: GenerationParameters
  , #[serde(default)]
    pub reasoning: ReasoningStrategy
}

fn default_concurrency_budget() -> usize
{   DispatchConfig::DEFAULT_CONCURRENCY_BUDGET
}

impl DispatchConfig
{   pub const DEFAULT_CONCURRENCY_BUDGET: usize = 20;

    pub fn new(backend: BackendConfig) -> Self
    {   DispatchConfig
        {   backend
          , retry: RetryConfig::default()
          , concurrency_budget: Self::DEFAULT_CONCURRENCY_BUDGET
          , generation: GenerationParameters::default()
          , reasoning: ReasoningStrategy::default()
        }
    }

    /// Load a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading dispatch config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
          Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        let config: DispatchConfig = serde_json::from_str(&text)
          .map_err(|e| Error::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `LMDISPATCH_*` environment variables.
    /// `LMDISPATCH_MODEL` is required; a `provider/model` string selects
    /// the provider when `LMDISPATCH_PROVIDER` is unset.
    pub fn from_env() -> Result<Self, Error>
    {   let model = std::env::var(ENV_MODEL).map_err(|_| {
          Error::InvalidConfiguration(format!("{} is not set", ENV_MODEL))
        })?;
        let provider_name = std::env::var(ENV_PROVIDER)
          .ok()
          .or_else(|| model.split('/').next().map(str::to_string))
          .unwrap_or_default();
        let provider = Provider::from_name(&provider_name)
          .ok_or_else(|| {
            Error::InvalidConfiguration(
              format!("Unknown provider: {}", provider_name)
            )
          })?;

        let mut config = DispatchConfig::new(
          BackendConfig::new(provider, model)
        );
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `LMDISPATCH_*` variables that are set.
    pub fn apply_env_overrides(&mut self) -> Result<(), Error>
    {   if let Ok(raw) = std::env::var(ENV_CONCURRENT_CALLS)
        {   self.concurrency_budget = raw.trim().parse().map_err(|_| {
              Error::InvalidConfiguration(
                format!("{}={} is not an integer", ENV_CONCURRENT_CALLS, raw)
              )
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_MAX_N)
        {   self.backend.max_n = Some(raw.trim().parse().map_err(|_| {
              Error::InvalidConfiguration(
                format!("{}={} is not an integer", ENV_MAX_N, raw)
              )
            })?);
        }
        if let Ok(base) = std::env::var(ENV_BASE_URL)
        {   self.backend.api_base = Some(base);
        }
        if let Ok(key) = std::env::var(ENV_API_KEY)
        {   self.backend.api_key = Some(key);
        }
        if let Ok(version) = std::env::var(ENV_API_VERSION)
        {   self.backend.api_version = Some(version);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), Error>
    {   if self.concurrency_budget == 0
        {   return Err(Error::InvalidConfiguration(
              "concurrency_budget must be at least 1".to_string()
            ));
        }
        if self.retry.max_attempts == 0
        {   return Err(Error::InvalidConfiguration(
              "retry.max_attempts must be at least 1".to_string()
            ));
        }
        if self.backend.max_n == Some(0)
        {   return Err(Error::InvalidConfiguration(
              "backend.max_n must be at least 1".to_string()
            ));
        }
        if self.backend.model.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "backend.model is empty".to_string()
            ));
        }
        if self.concurrency_budget > 100
        {   warn!(
              "concurrency_budget {} is likely to hit provider rate limits",
              self.concurrency_budget
            );
        }
        Ok(())
    }
}
