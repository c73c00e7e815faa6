//! Satisfying more samples than one call can return

use log::{debug, warn};

use crate::executor::{Pause, SingleCallExecutor, TokioPause};
use crate::providers::CompletionBackend;
use crate::request::{LogicalRequest, RawResponse};
use crate::shaper::RequestShaper;

/// Shapes a logical request and runs it as one call, or as
/// `num_samples` sequential single-sample calls when the provider cap
/// is too small.
pub struct SampleMultiplexer<B, P = TokioPause>
{   shaper: RequestShaper
  , executor: SingleCallExecutor<B, P>
}

impl<B: CompletionBackend, P: Pause> SampleMultiplexer<B, P>
{   pub fn new(
      shaper: RequestShaper
    , executor: SingleCallExecutor<B, P>
    ) -> Self
    {   SampleMultiplexer
        {   shaper
          , executor
        }
    }

    pub fn shaper(&self) -> &RequestShaper
    {   &self.shaper
    }

    pub fn executor(&self) -> &SingleCallExecutor<B, P>
    {   &self.executor
    }

    /// Exactly `num_samples` candidates, or the empty sentinel.
    pub async fn generate(&self, request: &LogicalRequest) -> RawResponse
    {   let shaped = self.shaper.shape(request);
        if !shaped.multiplex
        {   return self.executor.execute(&shaped.params).await;
        }

        warn!(
          "Number of parallel generations `n` will be set to 1, \
           and the call will repeat {} times",
          shaped.samples
        );
        let mut responses = Vec::with_capacity(shaped.samples as usize);
        for index in 0..shaped.samples
        {   let response = self.executor.execute(&shaped.params).await;
            if response.is_empty()
            {   warn!(
                  "Sample {}/{} came back empty; dropping the merged response",
                  index + 1,
                  shaped.samples
                );
                return RawResponse::empty();
            }
            responses.push(response);
        }
        debug!("Merging {} single-sample responses", responses.len());
        RawResponse::merge(responses)
    }
}
