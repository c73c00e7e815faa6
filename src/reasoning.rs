//! Recovering answer text from reasoning models

use serde::{Deserialize, Serialize};
use log::debug;

use crate::request::Candidate;

/// How private reasoning is located in a provider response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasoningStrategy
{   /// Never look at reasoning; missing text becomes ""
    Disabled
  , /// Trust the provider's `reasoning_content` field
    #[default]
    ProviderField
  , /// Reasoning is inlined in the text between two markers
    Markup
    {   think_start: String
      , response_start: String
    }
}

impl ReasoningStrategy
{   /// DeepSeek-R1 style `<think>...</think>answer`.
    pub fn deepseek_r1() -> Self
    {   ReasoningStrategy::Markup
        {   think_start: "<think>".to_string()
          , response_start: "</think>".to_string()
        }
    }

    /// Make the candidate's visible text non-null.
    pub fn normalize(&self, candidate: &mut Candidate)
    {   if let ReasoningStrategy::Markup { think_start, response_start }
          = self
        {   if let Some(output) = candidate.text.take()
            {   let (reasoning, content)
                  = split_markup(&output, think_start, response_start);
                if reasoning.is_some()
                {   candidate.reasoning_content = reasoning;
                }
                candidate.text = content;
            }
        }

        if candidate.text.is_none()
        {   debug!("Response is empty, replacing with reasoning content");
            let fallback = match self
            {   ReasoningStrategy::Disabled => None
              , _ => candidate.reasoning_content.clone()
            };
            candidate.text = Some(fallback.unwrap_or_default());
        }
    }
}

/// Split `output` into (reasoning, answer). Without both markers the
/// whole output is the answer; an empty answer part is reported as
/// missing.
pub fn split_markup(
  output: &str
, think_start: &str
, response_start: &str
) -> (Option<String>, Option<String>)
{   let Some(start) = output.find(think_start)
    else
    {   return (None, Some(output.to_string()));
    };
    let after_start = &output[start + think_start.len()..];
    let Some(end) = after_start.find(response_start)
    else
    {   return (None, Some(output.to_string()));
    };

    let reasoning = after_start[..end].to_string();
    let answer = &after_start[end + response_start.len()..];
    if answer.is_empty()
    {   (Some(reasoning), None)
    } else
    {   (Some(reasoning), Some(answer.to_string()))
    }
}
