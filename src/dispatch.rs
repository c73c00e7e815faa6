//! Bounded worker pool over one batch of independent requests
//!
//! Jobs go out over an mpsc queue tagged with their submission index;
//! workers send `(index, response)` back and the results are slotted
//! into place, so completion order never leaks to the caller.

use std::sync::Arc;

use log::{debug, error};
use tokio::sync::{mpsc, Mutex};

use crate::error::Error;
use crate::executor::{Pause, TokioPause};
use crate::multiplex::SampleMultiplexer;
use crate::providers::CompletionBackend;
use crate::request::{LogicalRequest, RawResponse};

/// `ceil(budget / samples)`, at least 1.
pub fn pool_width(budget: usize, samples: u32) -> usize
{   let samples = samples.max(1) as usize;
    budget.max(1).div_ceil(samples)
}

pub struct ConcurrencyDispatcher<B, P = TokioPause>
{   multiplexer: Arc<SampleMultiplexer<B, P>>
  , budget: usize
}

impl<B, P> ConcurrencyDispatcher<B, P>
where
  B: CompletionBackend + 'static
, P: Pause + 'static
{   pub fn new(
      multiplexer: Arc<SampleMultiplexer<B, P>>
    , budget: usize
    ) -> Self
    {   ConcurrencyDispatcher
        {   multiplexer
          , budget
        }
    }

    pub fn budget(&self) -> usize
    {   self.budget
    }

    /// Run one dataset split. All requests are assumed to share the
    /// first request's sample count. Output `i` belongs to request `i`.
    pub async fn dispatch(&self, requests: Vec<LogicalRequest>)
      -> Result<Vec<RawResponse>, Error>
    {   let total = requests.len();
        if total == 0
        {   return Ok(vec![]);
        }
        let samples = requests[0].num_samples;
        let width = pool_width(self.budget, samples).min(total);
        debug!(
          "Dispatching {} requests (n={}) over {} workers, budget {}",
          total,
          samples,
          width,
          self.budget
        );

        let (job_tx, job_rx)
          = mpsc::unbounded_channel::<(usize, LogicalRequest)>();
        for job in requests.into_iter().enumerate()
        {   job_tx
              .send(job)
              .map_err(|_| Error::Other("Job queue closed".to_string()))?;
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let (done_tx, mut done_rx)
          = mpsc::unbounded_channel::<(usize, RawResponse)>();
        let mut workers = Vec::with_capacity(width);
        for worker in 0..width
        {   let job_rx = Arc::clone(&job_rx);
            let done_tx = done_tx.clone();
            let multiplexer = Arc::clone(&self.multiplexer);
            workers.push(tokio::spawn(async move {
              loop
              { let next = job_rx.lock().await.recv().await;
                let Some((index, request)) = next
                else
                {   break;
                };
                let response = multiplexer.generate(&request).await;
                if done_tx.send((index, response)).is_err()
                {   break;
                }
              }
              debug!("Worker {} drained", worker);
            }));
        }
        drop(done_tx);

        let mut slots: Vec<Option<RawResponse>>
          = (0..total).map(|_| None).collect();
        while let Some((index, response)) = done_rx.recv().await
        {   slots[index] = Some(response);
        }
        for handle in workers
        {   if let Err(e) = handle.await
            {   error!("Dispatch worker failed: {}", e);
            }
        }

        slots
          .into_iter()
          .enumerate()
          .map(|(index, slot)| {
            slot.ok_or_else(|| {
              error!("Request {} of {} produced no result", index, total);
              Error::BatchIntegrity { index, total }
            })
          })
          .collect()
    }
}
