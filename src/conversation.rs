//! Sequential driver for multi-turn conversations

use std::sync::Arc;

use log::debug;

use crate::executor::{Pause, TokioPause};
use crate::multiplex::SampleMultiplexer;
use crate::providers::CompletionBackend;
use crate::request::{ChatMessage, Conversation, LogicalRequest, MultiTurnResponse};

/// Placeholder a later turn uses to quote an earlier model answer.
pub const MODEL_RESPONSE_PLACEHOLDER: &str = "{model_response}";

/// Fill placeholder-bearing messages of one turn from prior turns.
///
/// The k-th message holding the placeholder receives turn k's sample-0
/// output; messages beyond the recorded turns are left untouched.
pub fn substitute_prior_responses(
  messages: &[ChatMessage]
, prior_turns: &[Vec<String>]
) -> Vec<ChatMessage>
{   let mut next_turn = 0;
    messages
      .iter()
      .map(|message| {
        if !message.content.contains(MODEL_RESPONSE_PLACEHOLDER)
        {   return message.clone();
        }
        let Some(answer) = prior_turns
          .get(next_turn)
          .and_then(|samples| samples.first())
        else
        {   return message.clone();
        };
        next_turn += 1;
        ChatMessage
        {   role: message.role
          , content: message.content
              .replace(MODEL_RESPONSE_PLACEHOLDER, answer)
        }
      })
      .collect()
}

pub struct ConversationDriver<B, P = TokioPause>
{   multiplexer: Arc<SampleMultiplexer<B, P>>
}

impl<B: CompletionBackend, P: Pause> ConversationDriver<B, P>
{   pub fn new(multiplexer: Arc<SampleMultiplexer<B, P>>) -> Self
    {   ConversationDriver { multiplexer }
    }

    /// Run every turn in order. Each turn issues single-sample calls
    /// one after another; greedy decoding issues one call and repeats
    /// its answer.
    pub async fn drive(&self, conversation: &Conversation)
      -> MultiTurnResponse
    {   let samples = conversation.num_samples.max(1) as usize;
        let deterministic = conversation.temperature == Some(0.0);
        let mut state: Vec<Vec<String>>
          = Vec::with_capacity(conversation.turns.len());

        for (turn, template) in conversation.turns.iter().enumerate()
        {   let request = LogicalRequest
            {   prompt: substitute_prior_responses(template, &state)
              , stop_sequence: conversation.stop_sequence.clone()
              , max_new_tokens: conversation.max_new_tokens
              , num_samples: 1
              , temperature: conversation.temperature
              , return_logits: conversation.return_logits
            };

            let outputs = if deterministic && samples > 1
            {   debug!(
                  "Turn {}: temperature 0, one call repeated {} times",
                  turn,
                  samples
                );
                let text = self.multiplexer
                  .generate(&request)
                  .await
                  .first_text();
                vec![text; samples]
            } else
            {   let mut outputs = Vec::with_capacity(samples);
                for _ in 0..samples
                {   outputs.push(
                      self.multiplexer.generate(&request).await.first_text()
                    );
                }
                outputs
            };
            state.push(outputs);
        }

        MultiTurnResponse
        {   result: state
          , input_tokens: vec![]
          , generated_tokens: vec![]
          , truncated_tokens_count: 0
          , padded_tokens_count: 0
        }
    }
}
