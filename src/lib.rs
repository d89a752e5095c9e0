pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod translate;
pub mod poller;
pub mod stream;
pub mod usage;
pub mod response;
pub mod client;

/*

replicate-chat: OpenAI-style chat completions served by Replicate's
asynchronous predictions API. A chat request becomes one prediction
job; the non-streaming path polls the job to completion, the
streaming path follows the job's SSE subscription and turns it into
`chat.completion.chunk` deltas.

replicate-chat/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and stream reply types
│   ├── error.rs        # Error taxonomy and HTTP-equivalent statuses
│   ├── config.rs       # Backend and polling configuration
│   ├── request.rs      # OpenAI-style request/response types
│   ├── translate.rs    # Chat request -> prediction input
│   ├── providers/
│   │   ├── mod.rs
│   │   └── replicate.rs  # Wire types and HTTP calls
│   ├── poller.rs       # Status polling, multi-attempt or single-shot
│   ├── stream.rs       # SSE line framing and normalization
│   ├── usage.rs        # Token usage from job metrics
│   ├── response.rs     # Completion and chunk envelopes
│   └── client.rs       # ChatClient facade and stream reader task
└── tests/              # Integration tests against a mock backend

*/

pub use client::ChatClient;
pub use config::{PollConfig, ReplicateConfig};
pub use error::Error;
pub use request::{
  ChatCompletionChunk, ChatCompletionResponse, ChatMessage, ChatRequest,
  ContentPart, ImageUrl, MessageContent, Usage
};

// ===== Streaming =====

/// One item of a chat stream; an `Err` is always the last item
pub type StreamReply = Result<ChatCompletionChunk, crate::error::Error>;
pub type StreamReplySender
  = tokio::sync::mpsc::UnboundedSender<StreamReply>;
pub type StreamReplyReceiver
  = tokio::sync::mpsc::UnboundedReceiver<StreamReply>;
