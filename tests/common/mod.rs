#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lmdispatch::providers::{CallOutcome, CompletionBackend};
use lmdispatch::request::{Candidate, ProviderCallParams, RawResponse, Usage};
use lmdispatch::Pause;

pub fn init_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}

type Responder
  = Box<dyn Fn(&ProviderCallParams, usize) -> CallOutcome + Send + Sync>;
type Latency
  = Box<dyn Fn(&ProviderCallParams) -> Duration + Send + Sync>;

/// Backend answering from a closure `(params, call_index)` and
/// recording every call it receives
pub struct ScriptedBackend
{   responder: Responder
  , latency: Option<Latency>
  , calls: Mutex<Vec<ProviderCallParams>>
}

impl ScriptedBackend
{   pub fn new(
      responder: impl Fn(&ProviderCallParams, usize) -> CallOutcome
        + Send + Sync + 'static
    ) -> Arc<Self>
    {   Arc::new(ScriptedBackend
        {   responder: Box::new(responder)
          , latency: None
          , calls: Mutex::new(vec![])
        })
    }

    pub fn with_latency(
      responder: impl Fn(&ProviderCallParams, usize) -> CallOutcome
        + Send + Sync + 'static
    , latency: impl Fn(&ProviderCallParams) -> Duration
        + Send + Sync + 'static
    ) -> Arc<Self>
    {   Arc::new(ScriptedBackend
        {   responder: Box::new(responder)
          , latency: Some(Box::new(latency))
          , calls: Mutex::new(vec![])
        })
    }

    pub fn calls(&self) -> Vec<ProviderCallParams>
    {   self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize
    {   self.calls.lock().unwrap().len()
    }
}

impl CompletionBackend for ScriptedBackend
{   async fn complete(&self, params: &ProviderCallParams) -> CallOutcome
    {   let index =
        {   let mut calls = self.calls.lock().unwrap();
            calls.push(params.clone());
            calls.len() - 1
        };
        if let Some(latency) = &self.latency
        {   tokio::time::sleep(latency(params)).await;
        }
        (self.responder)(params, index)
    }
}

/// Records requested waits instead of sleeping
#[derive(Clone, Default)]
pub struct RecordingPause
{   waits: Arc<Mutex<Vec<Duration>>>
}

impl RecordingPause
{   pub fn waits(&self) -> Vec<Duration>
    {   self.waits.lock().unwrap().clone()
    }
}

impl Pause for RecordingPause
{   fn pause(&self, wait: Duration) -> impl Future<Output = ()> + Send
    {   self.waits.lock().unwrap().push(wait);
        std::future::ready(())
    }
}

pub fn success(texts: &[&str]) -> CallOutcome
{   CallOutcome::Success(RawResponse
    {   choices: texts.iter().map(|t| Candidate::text(*t)).collect()
      , usage: None
    })
}

/// `n` candidates named after the call index: `call{i}-{k}`.
pub fn numbered(params: &ProviderCallParams, index: usize) -> CallOutcome
{   CallOutcome::Success(RawResponse
    {   choices: (0..params.n)
          .map(|k| Candidate::text(format!("call{}-{}", index, k)))
          .collect()
      , usage: Some(Usage
        {   completion_tokens: Some(10)
          , total_tokens: Some(15)
          , estimated_cost: None
        })
    })
}

/// Content of the last message sent.
pub fn last_content(params: &ProviderCallParams) -> String
{   params.messages
      .last()
      .map(|m| m.content.clone())
      .unwrap_or_default()
}
