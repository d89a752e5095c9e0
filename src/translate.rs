//! OpenAI chat request to Replicate job input

use log::trace;
use crate::providers::replicate::{PredictionInput, PredictionRequest};
use crate::request::ChatRequest;

/// Floor applied to the resolved output token limit
pub const MIN_MAX_TOKENS: u32 = 1024;

const ASSISTANT_CUE: &str = "assistant: \n";

/// `max_tokens`, falling back to `max_completion_tokens`, then floored
pub fn resolve_max_tokens(request: &ChatRequest) -> u32
{   let primary = request.max_tokens.unwrap_or(0);
    let resolved = if primary == 0
    {   request.max_completion_tokens.unwrap_or(0)
    } else
    {   primary
    };
    resolved.max(MIN_MAX_TOKENS)
}

/// Flatten a chat request into the backend's job input.
///
/// System turns go to `system_prompt`; every other turn is written as
/// `"<role>: \n<text>\n"` and the prompt ends with an assistant cue.
/// Only the last image seen, in any role, is kept.
pub fn translate(request: &ChatRequest) -> PredictionInput
{   let max_tokens = resolve_max_tokens(request);

    let mut system_prompt = String::new();
    let mut prompt = String::new();
    let mut image: Option<String> = None;

    for message in &request.messages
    {   if let Some(url) = message.content.image_urls().last()
        {   image = Some(url.to_string());
        }

        if message.role == "system"
        {   system_prompt.push_str(&message.content.text());
            system_prompt.push('\n');
            continue;
        }

        prompt.push_str(&message.role);
        prompt.push_str(": \n");
        prompt.push_str(&message.content.text());
        prompt.push('\n');
    }

    prompt.push_str(ASSISTANT_CUE);

    let input = PredictionInput
    {   prompt
      , system_prompt
      , image
      , max_tokens
      , min_tokens: 0
      , temperature: request.temperature
      , top_p: request.top_p
      , presence_penalty: request.presence_penalty
      , frequency_penalty: request.frequency_penalty
    };
    trace!("Translated input: {:?}", input);
    input
}

/// Full job-creation body
pub fn to_prediction_request(request: &ChatRequest) -> PredictionRequest
{   PredictionRequest
    {   stream: request.stream
      , input: translate(request)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::{
      ChatMessage, ContentPart, ImageUrl, MessageContent
    };

    fn image_message(role: &str, url: &str) -> ChatMessage
    {   ChatMessage
        {   role: role.to_string()
          , content: MessageContent::Parts(vec![
              ContentPart::Text { text: "see".to_string() }
            , ContentPart::ImageUrl
              {   image_url: ImageUrl
                  {   url: url.to_string()
                    , detail: None
                  }
              }
            ])
        }
    }

    fn request(messages: Vec<ChatMessage>) -> ChatRequest
    {   ChatRequest
        {   model: "meta/llama".to_string()
          , messages
          , ..ChatRequest::default()
        }
    }

    #[test]
    fn small_limits_are_raised_to_floor()
    {   for limit in [None, Some(0), Some(1), Some(512), Some(1023)]
        {   let mut req = request(vec![ChatMessage::user("hi")]);
            req.max_tokens = limit;
            assert_eq!(translate(&req).max_tokens, 1024);
        }

        let mut req = request(vec![]);
        req.max_tokens = Some(4096);
        assert_eq!(translate(&req).max_tokens, 4096);
    }

    #[test]
    fn completion_alias_used_when_primary_unset()
    {   let mut req = request(vec![]);
        req.max_completion_tokens = Some(2048);
        assert_eq!(translate(&req).max_tokens, 2048);

        req.max_tokens = Some(0);
        assert_eq!(translate(&req).max_tokens, 2048);

        req.max_completion_tokens = Some(100);
        assert_eq!(translate(&req).max_tokens, 1024);

        req.max_tokens = Some(3000);
        req.max_completion_tokens = Some(5000);
        assert_eq!(translate(&req).max_tokens, 3000);
    }

    #[test]
    fn prompt_is_flattened_with_roles_and_cue()
    {   let req = request(vec![
          ChatMessage::system("Be terse.")
        , ChatMessage::user("Hi")
        , ChatMessage::assistant("Hello")
        , ChatMessage::user("Bye")
        ]);
        let input = translate(&req);
        assert_eq!(input.system_prompt, "Be terse.\n");
        assert_eq!(
          input.prompt,
          "user: \nHi\nassistant: \nHello\nuser: \nBye\nassistant: \n"
        );
        assert_eq!(input.min_tokens, 0);
        assert!(input.image.is_none());
    }

    #[test]
    fn empty_request_still_gets_cue()
    {   let input = translate(&request(vec![]));
        assert_eq!(input.prompt, "assistant: \n");
        assert_eq!(input.system_prompt, "");
    }

    #[test]
    fn last_image_wins_across_roles()
    {   let req = request(vec![
          image_message("user", "https://img/m1.png")
        , image_message("assistant", "https://img/m2.png")
        , ChatMessage::user("which one?")
        ]);
        let input = translate(&req);
        assert_eq!(input.image.as_deref(), Some("https://img/m2.png"));
        assert_eq!(
          input.prompt,
          "user: \nsee\nassistant: \nsee\nuser: \nwhich one?\nassistant: \n"
        );
    }

    #[test]
    fn sampling_parameters_are_carried()
    {   let mut req = request(vec![ChatMessage::user("x")]);
        req.temperature = Some(0.5);
        req.top_p = Some(0.9);
        req.presence_penalty = Some(0.1);
        req.frequency_penalty = Some(0.2);
        req.stream = true;
        let body = to_prediction_request(&req);
        assert!(body.stream);
        assert_eq!(body.input.temperature, Some(0.5));
        assert_eq!(body.input.top_p, Some(0.9));
        assert_eq!(body.input.presence_penalty, Some(0.1));
        assert_eq!(body.input.frequency_penalty, Some(0.2));
    }

    #[test]
    fn translation_is_idempotent()
    {   let mut req = request(vec![
          ChatMessage::system("sys")
        , image_message("user", "https://img/a.png")
        ]);
        req.max_tokens = Some(10);
        let first = serde_json::to_vec(&translate(&req)).unwrap();
        let second = serde_json::to_vec(&translate(&req)).unwrap();
        assert_eq!(first, second);
        assert_eq!(req.max_tokens, Some(10));
    }
}
