//! One provider call with bounded retries
//!
//! Every attempt ends in one of three ways: the provider answers
//! (normalise and return), refuses the content for good (return the
//! empty sentinel at once), or fails transiently (sleep and try
//! again). Running out of attempts also yields the empty sentinel, so
//! callers never see an error from here.

use std::future::Future;
use std::time::Duration;

use log::{debug, error, warn};

use crate::providers::{CallOutcome, CompletionBackend};
use crate::reasoning::ReasoningStrategy;
use crate::request::{ProviderCallParams, RawResponse};
use crate::retry::RetryPolicy;

/// Where the executor waits between attempts.
pub trait Pause: Send + Sync
{   fn pause(&self, wait: Duration) -> impl Future<Output = ()> + Send;
}

/// Real wall-clock sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

impl Pause for TokioPause
{   fn pause(&self, wait: Duration) -> impl Future<Output = ()> + Send
    {   tokio::time::sleep(wait)
    }
}

pub struct SingleCallExecutor<B, P = TokioPause>
{   backend: B
  , retry: RetryPolicy
  , reasoning: ReasoningStrategy
  , pause: P
}

impl<B: CompletionBackend> SingleCallExecutor<B, TokioPause>
{   pub fn new(
      backend: B
    , retry: RetryPolicy
    , reasoning: ReasoningStrategy
    ) -> Self
    {   SingleCallExecutor::with_pause(backend, retry, reasoning, TokioPause)
    }
}

impl<B: CompletionBackend, P: Pause> SingleCallExecutor<B, P>
{   pub fn with_pause(
      backend: B
    , retry: RetryPolicy
    , reasoning: ReasoningStrategy
    , pause: P
    ) -> Self
    {   SingleCallExecutor
        {   backend
          , retry
          , reasoning
          , pause
        }
    }

    pub fn backend(&self) -> &B
    {   &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy
    {   &self.retry
    }

    /// Always returns: a normalised response, or `RawResponse::empty()`.
    pub async fn execute(&self, params: &ProviderCallParams) -> RawResponse
    {   let attempts = self.retry.max_attempts;
        for attempt in 0..attempts
        {   debug!(
              "Calling {} (n={}), attempt {}/{}",
              params.model,
              params.n,
              attempt + 1,
              attempts
            );
            match self.backend.complete(params).await
            {   CallOutcome::Success(mut response) => {
                  for candidate in response.choices.iter_mut()
                  {   self.reasoning.normalize(candidate);
                  }
                  return response;
                }
              , CallOutcome::PermanentRejection(reason) => {
                  warn!(
                    "Content policy rejection, returning empty response: {}",
                    reason
                  );
                  return RawResponse::empty();
                }
              , CallOutcome::TransientError(e) => {
                  if attempt + 1 == attempts
                  {   warn!(
                        "Error in API call: {}, no attempts left ({}/{})",
                        e,
                        attempt + 1,
                        attempts
                      );
                      break;
                  }
                  let wait = self.retry.backoff_for_attempt(attempt);
                  warn!(
                    "Error in API call: {}, waiting {:.1}s before retry {}/{}",
                    e,
                    wait.as_secs_f64(),
                    attempt + 1,
                    attempts
                  );
                  self.pause.pause(wait).await;
                }
            }
        }

        error!(
          "API call failed after {} attempts, returning empty response",
          attempts
        );
        RawResponse::empty()
    }
}
