mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{init_logging, last_content, success, RecordingPause, ScriptedBackend};
use lmdispatch::config::GenerationParameters;
use lmdispatch::dispatch::{pool_width, ConcurrencyDispatcher};
use lmdispatch::error::Error;
use lmdispatch::providers::CallOutcome;
use lmdispatch::reasoning::ReasoningStrategy;
use lmdispatch::request::{ChatMessage, LogicalRequest};
use lmdispatch::retry::RetryPolicy;
use lmdispatch::{Provider, ProviderIdentity, RequestShaper, SampleMultiplexer, SingleCallExecutor};

fn dispatcher(
  backend: Arc<ScriptedBackend>
, budget: usize
, max_n: Option<u32>
) -> ConcurrencyDispatcher<Arc<ScriptedBackend>, RecordingPause>
{   let multiplexer = SampleMultiplexer::new(
      RequestShaper::new(
        ProviderIdentity::new(Provider::OpenAI, "gpt-4o-mini")
      , max_n
      , GenerationParameters::default()
      )
    , SingleCallExecutor::with_pause(
        backend
      , RetryPolicy::default()
      , ReasoningStrategy::default()
      , RecordingPause::default()
      )
    );
    ConcurrencyDispatcher::new(Arc::new(multiplexer), budget)
}

fn batch(size: usize, samples: u32) -> Vec<LogicalRequest>
{   (0..size)
      .map(|i| {
        LogicalRequest::new(vec![ChatMessage::user(format!("q{}", i))])
          .with_samples(samples)
      })
      .collect()
}

fn echo(params: &lmdispatch::request::ProviderCallParams, _: usize)
  -> CallOutcome
{   let text = last_content(params);
    let texts: Vec<&str> = (0..params.n).map(|_| text.as_str()).collect();
    success(&texts)
}

#[test]
fn test_pool_width_divides_budget_by_samples()
{   assert_eq!(pool_width(20, 1), 20);
    assert_eq!(pool_width(20, 3), 7);
    assert_eq!(pool_width(20, 20), 1);
    assert_eq!(pool_width(20, 64), 1);
    assert_eq!(pool_width(20, 0), 20);
}

#[tokio::test]
async fn test_empty_batch()
{   let backend = ScriptedBackend::new(echo);
    let results = dispatcher(backend.clone(), 4, None)
      .dispatch(vec![])
      .await;
    assert_eq!(results, Ok(vec![]));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_results_follow_submission_order()
{   init_logging();
    // later prompts finish first
    let backend = ScriptedBackend::with_latency(echo, |params| {
      let index: u64 = last_content(params)[1..].parse().unwrap_or(0);
      Duration::from_millis((40 - index) % 7 * 3)
    });
    let results = dispatcher(backend.clone(), 8, None)
      .dispatch(batch(40, 1))
      .await
      .expect("batch should complete");

    assert_eq!(results.len(), 40);
    for (i, response) in results.iter().enumerate()
    {   assert_eq!(response.texts(), vec![format!("q{}", i)]);
    }
    assert_eq!(backend.call_count(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_calls_bounded_by_pool_width()
{   let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (leave, seen) = (in_flight.clone(), peak.clone());
    let backend = ScriptedBackend::with_latency(
      move |params, index| {
        leave.fetch_sub(1, Ordering::SeqCst);
        echo(params, index)
      }
    , {
        let in_flight = in_flight.clone();
        move |_| {
          let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
          seen.fetch_max(now, Ordering::SeqCst);
          Duration::from_millis(5)
        }
      }
    );

    // budget 6 over 3 samples per request -> 2 workers
    let results = dispatcher(backend.clone(), 6, None)
      .dispatch(batch(12, 3))
      .await
      .expect("batch should complete");

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|r| r.choices.len() == 3));
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exhausted_request_does_not_abort_batch()
{   init_logging();
    let backend = ScriptedBackend::new(|params, index| {
      if last_content(params) == "q2"
      {   CallOutcome::TransientError(Error::Timeout)
      } else
      {   echo(params, index)
      }
    });
    let results = dispatcher(backend.clone(), 4, None)
      .dispatch(batch(4, 1))
      .await
      .expect("batch should complete");

    assert!(results[2].is_empty());
    assert_eq!(results[3].texts(), vec!["q3"]);
    assert_eq!(backend.call_count(), 3 + 5);
}

#[tokio::test]
async fn test_missing_result_fails_the_batch()
{   let backend = ScriptedBackend::new(|params, index| {
      if last_content(params) == "q1"
      {   panic!("worker lost");
      }
      echo(params, index)
    });
    let results = dispatcher(backend, 3, None)
      .dispatch(batch(3, 1))
      .await;

    assert_eq!(results, Err(Error::BatchIntegrity { index: 1, total: 3 }));
}

#[tokio::test]
async fn test_multiplexed_batch_keeps_sample_counts()
{   let backend = ScriptedBackend::new(echo);
    let results = dispatcher(backend.clone(), 20, Some(1))
      .dispatch(batch(5, 4))
      .await
      .expect("batch should complete");

    for (i, response) in results.iter().enumerate()
    {   assert_eq!(response.texts(), vec![format!("q{}", i); 4]);
    }
    assert_eq!(backend.call_count(), 20);
}
