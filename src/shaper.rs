//! Turning a logical request into provider-legal call parameters

use log::warn;

use crate::config::GenerationParameters;
use crate::request::{LogicalRequest, ProviderCallParams};
use crate::{Provider, ProviderIdentity};

/// Reasoning-family budgets are inflated by this factor...
pub const REASONING_BUDGET_MULTIPLIER: i64 = 10;
/// ...and clamped to this many tokens.
pub const REASONING_BUDGET_CAP: i64 = 32_000;

/// Parameters for one call plus whether the request has to be split
/// into single-sample calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedCall
{   pub params: ProviderCallParams
  , /// When set, `params.n` is 1 and the caller must issue
    /// `samples` calls
    pub multiplex: bool
  , pub samples: u32
}

/// Pure mapping from `LogicalRequest` to `ProviderCallParams` for one
/// provider identity
#[derive(Debug, Clone, PartialEq)]
pub struct RequestShaper
{   identity: ProviderIdentity
  , max_n: Option<u32>
  , generation: GenerationParameters
}

impl RequestShaper
{   pub fn new(
      identity: ProviderIdentity
    , max_n: Option<u32>
    , generation: GenerationParameters
    ) -> Self
    {   RequestShaper
        {   identity
          , max_n
          , generation
        }
    }

    pub fn identity(&self) -> &ProviderIdentity
    {   &self.identity
    }

    pub fn max_n(&self) -> Option<u32>
    {   self.max_n
    }

    pub fn shape(&self, request: &LogicalRequest) -> ShapedCall
    {   let samples = request.num_samples.max(1);
        let multiplex = self.max_n
          .map(|cap| samples > cap)
          .unwrap_or(false);

        let budget = self.prepare_max_new_tokens(request.max_new_tokens);
        let legacy_budget = self.identity.provider.uses_max_tokens_field();

        let mut params = ProviderCallParams
        {   model: self.identity.wire_model().to_string()
          , messages: request.prompt.clone()
          , n: if multiplex { 1 } else { samples }
          , stop: self.prepare_stop_sequence(&request.stop_sequence)
          , max_completion_tokens: if legacy_budget { None } else { budget }
          , max_tokens: if legacy_budget { budget } else { None }
          , temperature: request.temperature
              .or(self.generation.temperature)
          , top_p: self.generation.top_p
          , seed: self.generation.seed
          , frequency_penalty: self.generation.frequency_penalty
          , presence_penalty: self.generation.presence_penalty
          , logprobs: None
          , reasoning_effort: None
        };

        if request.return_logits
        {   if self.identity.provider == Provider::OpenAI
            {   params.logprobs = Some(true);
            } else
            {   warn!(
                  "Returning logits is not supported for {:?}, ignoring",
                  self.identity.provider
                );
            }
        }

        if self.identity.is_reasoning_family()
        {   params.reasoning_effort
              = self.generation.reasoning_effort.clone();
            if self.identity.provider == Provider::OpenAI
            {   warn!(
                  "{} does not support temperature, top_p or stop; disabling",
                  self.identity.model
                );
                params.temperature = None;
                params.top_p = None;
                params.frequency_penalty = None;
                params.presence_penalty = None;
                params.stop.clear();
            }
        }

        ShapedCall
        {   params
          , multiplex
          , samples
        }
    }

    /// Anthropic rejects whitespace-only stop sequences.
    pub fn prepare_stop_sequence(&self, stop: &[String]) -> Vec<String>
    {   match self.identity.provider
        {   Provider::Anthropic => stop
              .iter()
              .filter(|s| !s.trim().is_empty())
              .cloned()
              .collect()
          , _ => stop.to_vec()
        }
    }

    /// `None` means no cap is sent.
    pub fn prepare_max_new_tokens(&self, max_new_tokens: Option<i64>)
      -> Option<u32>
    {   let budget = match max_new_tokens
        {   Some(tokens) if tokens > 0 => tokens
          , _ => return None
        };
        let budget = if self.identity.is_reasoning_family()
        {   budget
              .saturating_mul(REASONING_BUDGET_MULTIPLIER)
              .min(REASONING_BUDGET_CAP)
        } else
        {   budget
        };
        Some(u32::try_from(budget).unwrap_or(u32::MAX))
    }
}
