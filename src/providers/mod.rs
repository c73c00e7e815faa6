//! LLM provider implementations

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::request::{ProviderCallParams, RawResponse};

pub mod openai;

// Re-export for convenience
pub use openai::HttpBackend;

/// Classified result of one provider call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome
{   Success(RawResponse)
  , /// The provider refuses this content; retrying cannot help
    PermanentRejection(String)
  , /// Network, timeout, rate limit, 5xx, unparseable body...
    TransientError(Error)
}

/// One provider invocation. Implementations classify their own
/// failures so callers never inspect error text.
pub trait CompletionBackend: Send + Sync
{   fn complete(
      &self
    , params: &ProviderCallParams
    ) -> impl Future<Output = CallOutcome> + Send;
}

impl<B: CompletionBackend> CompletionBackend for Arc<B>
{   fn complete(
      &self
    , params: &ProviderCallParams
    ) -> impl Future<Output = CallOutcome> + Send
    {   (**self).complete(params)
    }
}
