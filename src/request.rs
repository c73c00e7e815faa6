//! Unified request and response types for the dispatch engine

use serde::{Deserialize, Serialize};

/// Speaker of one prompt turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   System
  , User
  , Assistant
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: Role
  , pub content: String
}

impl ChatMessage
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   ChatMessage
        {   role
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   ChatMessage::new(Role::User, content)
    }
}

/// One evaluation prompt plus its generation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRequest
{   /// Ordered role/content turns
    pub prompt: Vec<ChatMessage>
  , /// Stop sequences
    #[serde(default)]
    pub stop_sequence: Vec<String>
  , /// Generation budget; unset or <= 0 means no limit
    #[serde(default)]
    pub max_new_tokens: Option<i64>
  , /// Number of completions wanted, >= 1
    pub num_samples: u32
  , /// Overrides the deployment's default temperature
    #[serde(default)]
    pub temperature: Option<f32>
  , /// Ask for per-token log probabilities
    #[serde(default)]
    pub return_logits: bool
}

impl LogicalRequest
{   /// A single-sample request with no stop sequence or budget.
    pub fn new(prompt: Vec<ChatMessage>) -> Self
    {   LogicalRequest
        {   prompt
          , stop_sequence: vec![]
          , max_new_tokens: None
          , num_samples: 1
          , temperature: None
          , return_logits: false
        }
    }

    pub fn with_samples(mut self, num_samples: u32) -> Self
    {   self.num_samples = num_samples;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self
    {   self.temperature = Some(temperature);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: i64) -> Self
    {   self.max_new_tokens = Some(max_new_tokens);
        self
    }

    pub fn with_stop_sequence(mut self, stop: Vec<String>) -> Self
    {   self.stop_sequence = stop;
        self
    }
}

/// Legal parameter set for exactly one provider invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderCallParams
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub n: u32
  , #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>
  , /// Same budget for servers that only know the older field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>
}

/// Token and cost counters reported for one or more calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage
{   #[serde(default)]
    pub completion_tokens: Option<u64>
  , #[serde(default)]
    pub total_tokens: Option<u64>
  , #[serde(default)]
    pub estimated_cost: Option<f64>
}

fn add_field<T: std::ops::Add<Output = T>>(a: Option<T>, b: Option<T>)
  -> Option<T>
{   match (a, b)
    {   (Some(a), Some(b)) => Some(a + b)
      , (a, None) => a
      , (None, b) => b
    }
}

impl Usage
{   /// Field-by-field sum; a field missing on both sides stays missing.
    pub fn merge(&self, other: &Usage) -> Usage
    {   Usage
        {   completion_tokens: add_field(
              self.completion_tokens
            , other.completion_tokens
            )
          , total_tokens: add_field(self.total_tokens, other.total_tokens)
          , estimated_cost: add_field(
              self.estimated_cost
            , other.estimated_cost
            )
        }
    }
}

/// One completion candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate
{   /// Visible answer; `None` until normalised by the executor
    pub text: Option<String>
  , /// Private reasoning, when the provider or markup exposes it
    #[serde(default)]
    pub reasoning_content: Option<String>
  , /// Opaque per-sample side channel
    #[serde(default)]
    pub logprobs: Option<serde_json::Value>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

impl Candidate
{   pub fn text(text: impl Into<String>) -> Self
    {   Candidate
        {   text: Some(text.into())
          , ..Default::default()
        }
    }
}

/// Result of one provider call, or the merge of several.
///
/// Zero candidates is the `EmptyResponse` sentinel: every request asks
/// for at least one sample, so an empty list only ever means total
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse
{   pub choices: Vec<Candidate>
  , #[serde(default)]
    pub usage: Option<Usage>
}

impl RawResponse
{   pub fn empty() -> Self
    {   RawResponse::default()
    }

    pub fn is_empty(&self) -> bool
    {   self.choices.is_empty()
    }

    /// Candidate texts in order, `None` read as `""`.
    pub fn texts(&self) -> Vec<String>
    {   self.choices
          .iter()
          .map(|c| c.text.clone().unwrap_or_default())
          .collect()
    }

    /// Text of the first candidate, `""` for the empty sentinel.
    pub fn first_text(&self) -> String
    {   self.choices
          .first()
          .and_then(|c| c.text.clone())
          .unwrap_or_default()
    }

    /// Concatenate candidates in call order and sum usage.
    pub fn merge(responses: Vec<RawResponse>) -> RawResponse
    {   let mut merged = RawResponse::empty();
        for resp in responses
        {   merged.choices.extend(resp.choices);
            merged.usage = match (merged.usage.take(), resp.usage)
            {   (Some(a), Some(b)) => Some(a.merge(&b))
              , (a, None) => a
              , (None, b) => b
            };
        }
        merged
    }
}

/// Multi-turn conversation where later turns may reference earlier
/// model output through the `{model_response}` placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation
{   /// Full message list to send for each turn
    pub turns: Vec<Vec<ChatMessage>>
  , #[serde(default)]
    pub stop_sequence: Vec<String>
  , #[serde(default)]
    pub max_new_tokens: Option<i64>
  , pub num_samples: u32
  , #[serde(default)]
    pub temperature: Option<f32>
  , #[serde(default)]
    pub return_logits: bool
}

/// Result record of one logical request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerativeResponse
{   /// Output texts, never null
    pub result: Vec<String>
  , /// Per-sample logprobs when requested and available
    pub logits: Option<Vec<serde_json::Value>>
  , pub generated_tokens: Vec<u32>
  , pub input_tokens: Vec<u32>
}

impl GenerativeResponse
{   pub fn from_raw(raw: &RawResponse) -> Self
    {   let logits: Vec<serde_json::Value> = raw.choices
          .iter()
          .filter_map(|c| c.logprobs.clone())
          .collect();
        GenerativeResponse
        {   result: raw.texts()
          , logits: if logits.is_empty() { None } else { Some(logits) }
          , generated_tokens: vec![]
          , input_tokens: vec![]
        }
    }
}

/// Result record of one conversation.
/// Token accounting is not computed for conversations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiTurnResponse
{   /// `result[turn][sample]`
    pub result: Vec<Vec<String>>
  , pub input_tokens: Vec<u32>
  , pub generated_tokens: Vec<u32>
  , pub truncated_tokens_count: u32
  , pub padded_tokens_count: u32
}
