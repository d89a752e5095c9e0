//! OpenAI-style request and response types exposed to callers

use serde::{Deserialize, Serialize};

// ===== Request Types =====

/// Inbound chat-completion request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>
  , /// Alias used only when `max_tokens` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>
  , #[serde(default)]
    pub stream: bool
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: MessageContent
}

impl ChatMessage
{   pub fn new(role: &str, text: &str) -> Self
    {   ChatMessage
        {   role: role.to_string()
          , content: MessageContent::Text(text.to_string())
        }
    }

    pub fn system(text: &str) -> Self
    {   ChatMessage::new("system", text)
    }

    pub fn user(text: &str) -> Self
    {   ChatMessage::new("user", text)
    }

    pub fn assistant(text: &str) -> Self
    {   ChatMessage::new("assistant", text)
    }
}

/// Either a bare string or a list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent
{   Text(String)
  , Parts(Vec<ContentPart>)
  , /// `null`, as sent for tool-call turns
    Null
}

impl Default for MessageContent
{   fn default() -> Self
    {   MessageContent::Text(String::new())
    }
}

impl MessageContent
{   /// Concatenation of all text parts
    pub fn text(&self) -> String
    {   match self
        {   MessageContent::Text(text) => text.clone()
          , MessageContent::Null => String::new()
          , MessageContent::Parts(parts) => parts
              .iter()
              .filter_map(|p| match p
              {   ContentPart::Text { text } => Some(text.as_str())
                , _ => None
              })
              .collect()
        }
    }

    /// Image URLs in the order they appear
    pub fn image_urls(&self) -> Vec<&str>
    {   match self
        {   MessageContent::Text(_) | MessageContent::Null => vec![]
          , MessageContent::Parts(parts) => parts
              .iter()
              .filter_map(|p| match p
              {   ContentPart::ImageUrl { image_url } =>
                    Some(image_url.url.as_str())
                , _ => None
              })
              .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart
{   Text
    {   text: String
    }
  , ImageUrl
    {   image_url: ImageUrl
    }
  , #[serde(other)]
    Unsupported
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl
{   pub url: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>
}

// ===== Response Types =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage
{   pub prompt_tokens: u64
  , pub completion_tokens: u64
  , pub total_tokens: u64
}

impl Usage
{   /// Total is derived here and nowhere else
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self
    {   Usage
        {   prompt_tokens
          , completion_tokens
          , total_tokens: prompt_tokens + completion_tokens
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage
{   pub role: String
  , pub content: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice
{   pub index: u32
  , pub message: ResponseMessage
  , pub finish_reason: Option<String>
}

/// Non-streaming chat completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse
{   pub id: String
  , pub object: String
  , pub created: i64
  , pub model: String
  , pub choices: Vec<Choice>
  , pub usage: Usage
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice
{   pub index: u32
  , pub delta: Delta
  , pub finish_reason: Option<String>
}

/// One streamed delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk
{   pub id: String
  , pub object: String
  , pub created: i64
  , pub model: String
  , pub choices: Vec<ChunkChoice>
  , /// Set on the terminal chunk only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>
}

impl ChatCompletionChunk
{   pub fn content(&self) -> Option<&str>
    {   self.choices.first()
          .and_then(|c| c.delta.content.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str>
    {   self.choices.first()
          .and_then(|c| c.finish_reason.as_deref())
    }
}

// ===== Error Types =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody
{   pub message: String
  , #[serde(rename = "type")]
    pub kind: String
  , pub code: String
}

/// Unified error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse
{   pub error: ErrorBody
  , /// HTTP status the caller should answer with
    #[serde(skip)]
    pub status: u16
}
