//! OpenAI-style response and chunk envelopes

use crate::providers::replicate::Prediction;
use crate::request::{
  ChatCompletionChunk, ChatCompletionResponse, Choice, ChunkChoice, Delta,
  ResponseMessage, Usage
};

pub const ASSISTANT_ROLE: &str = "assistant";
pub const FINISH_STOP: &str = "stop";

pub fn now_timestamp() -> i64
{   chrono::Utc::now().timestamp()
}

/// Single-choice completion from a succeeded job
pub fn assemble_completion(
  prediction: &Prediction
, model: &str
, usage: Usage
) -> ChatCompletionResponse
{   ChatCompletionResponse
    {   id: prediction.id.clone()
      , object: "chat.completion".to_string()
      , created: now_timestamp()
      , model: model.to_string()
      , choices: vec![
          Choice
          {   index: 0
            , message: ResponseMessage
              {   role: ASSISTANT_ROLE.to_string()
                , content: prediction.fragments().concat()
              }
            , finish_reason: Some(FINISH_STOP.to_string())
          }
        ]
      , usage
    }
}

/// Stamps chunks of one stream with the same id, timestamp and model.
/// The role rides on the first delta only.
#[derive(Debug, Clone)]
pub struct ChunkBuilder
{   id: String
  , created: i64
  , model: String
  , role_sent: bool
}

impl ChunkBuilder
{   pub fn new(id: &str, model: &str) -> Self
    {   ChunkBuilder
        {   id: id.to_string()
          , created: now_timestamp()
          , model: model.to_string()
          , role_sent: false
        }
    }

    fn chunk(
      &self
    , role: Option<String>
    , content: Option<String>
    , finish_reason: Option<String>
    , usage: Option<Usage>
    ) -> ChatCompletionChunk
    {   ChatCompletionChunk
        {   id: self.id.clone()
          , object: "chat.completion.chunk".to_string()
          , created: self.created
          , model: self.model.clone()
          , choices: vec![
              ChunkChoice
              {   index: 0
                , delta: Delta
                  {   role
                    , content
                  }
                , finish_reason
              }
            ]
          , usage
        }
    }

    pub fn delta(&mut self, text: String) -> ChatCompletionChunk
    {   let role = if self.role_sent
        {   None
        } else
        {   self.role_sent = true;
            Some(ASSISTANT_ROLE.to_string())
        };
        self.chunk(role, Some(text), None, None)
    }

    /// Terminal chunk: no text, finish reason stop, final usage
    pub fn stop(&self, usage: Usage) -> ChatCompletionChunk
    {   self.chunk(None, None, Some(FINISH_STOP.to_string()), Some(usage))
    }
}
