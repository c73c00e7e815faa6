//! Backoff schedule for transient provider failures

use std::time::Duration;
use log::debug;

use crate::config::RetryConfig;

/// Retry policy for failed provider calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub backoff_multiplier: f64
  , pub initial_backoff: Duration
  , pub max_backoff: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: usize
    , backoff_multiplier: f64
    , initial_backoff: Duration
    , max_backoff: Duration
    ) -> Self
    {   RetryPolicy
        {   max_attempts
          , backoff_multiplier
          , initial_backoff
          , max_backoff
        }
    }

    /// Wait before re-attempting after attempt number `attempt`
    /// (0-based): `min(max, initial * multiplier^attempt)`.
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        let multiplier
          = self.backoff_multiplier.powi(attempt as i32);
        let secs = self.initial_backoff.as_secs_f64() * multiplier;
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64()
        {   return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy
{   fn from(config: &RetryConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts
        , config.multiplier
        , Duration::from_secs_f64(config.base_sleep_secs.max(0.0))
        , Duration::from_secs_f64(config.max_wait_secs.max(0.0))
        )
    }
}
