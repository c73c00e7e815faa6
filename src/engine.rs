//! Dispatch engine facade

use std::sync::Arc;

use log::{debug, info};

use crate::config::DispatchConfig;
use crate::conversation::ConversationDriver;
use crate::dispatch::ConcurrencyDispatcher;
use crate::error::Error;
use crate::executor::{Pause, SingleCallExecutor, TokioPause};
use crate::multiplex::SampleMultiplexer;
use crate::providers::{CompletionBackend, HttpBackend};
use crate::request::{Conversation, GenerativeResponse, LogicalRequest, MultiTurnResponse};
use crate::retry::RetryPolicy;
use crate::shaper::RequestShaper;
use crate::ProviderIdentity;

/// Owns one backend and the components layered over it.
pub struct DispatchEngine<B, P = TokioPause>
{   dispatcher: ConcurrencyDispatcher<B, P>
  , driver: ConversationDriver<B, P>
}

impl DispatchEngine<HttpBackend, TokioPause>
{   /// Engine talking to the configured HTTP endpoint.
    pub fn from_config(config: DispatchConfig) -> Result<Self, Error>
    {   config.validate()?;
        let backend = HttpBackend::new(&config.backend)?;
        info!(
          "Dispatch engine for {:?}/{} at {}",
          config.backend.provider,
          config.backend.model,
          backend.endpoint()
        );
        Ok(DispatchEngine::with_backend(config, backend, TokioPause))
    }
}

impl<B, P> DispatchEngine<B, P>
where
  B: CompletionBackend + 'static
, P: Pause + 'static
{   pub fn with_backend(config: DispatchConfig, backend: B, pause: P)
      -> Self
    {   let DispatchConfig
        {   backend: backend_config
          , retry
          , concurrency_budget
          , generation
          , reasoning
        } = config;

        let shaper = RequestShaper::new(
          ProviderIdentity::new(backend_config.provider, backend_config.model)
        , backend_config.max_n
        , generation
        );
        let executor = SingleCallExecutor::with_pause(
          backend
        , RetryPolicy::from(&retry)
        , reasoning
        , pause
        );
        let multiplexer = Arc::new(SampleMultiplexer::new(shaper, executor));

        DispatchEngine
        {   dispatcher: ConcurrencyDispatcher::new(
              Arc::clone(&multiplexer)
            , concurrency_budget
            )
          , driver: ConversationDriver::new(multiplexer)
        }
    }

    /// Generate for one dataset split; output `i` answers request `i`.
    pub async fn generate(&self, batch: Vec<LogicalRequest>)
      -> Result<Vec<GenerativeResponse>, Error>
    {   let responses = self.dispatcher.dispatch(batch).await?;
        Ok(responses.iter().map(GenerativeResponse::from_raw).collect())
    }

    /// Drive conversations one after another.
    pub async fn generate_multi_turn(&self, conversations: &[Conversation])
      -> Vec<MultiTurnResponse>
    {   let mut results = Vec::with_capacity(conversations.len());
        for (index, conversation) in conversations.iter().enumerate()
        {   debug!(
              "Conversation {}/{} ({} turns)",
              index + 1,
              conversations.len(),
              conversation.turns.len()
            );
            results.push(self.driver.drive(conversation).await);
        }
        results
    }
}
