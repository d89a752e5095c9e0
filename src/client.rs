use tokio::sync::mpsc;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use crate::poller::{PollOutcome, PollPolicy};
use crate::providers::replicate::{Prediction, PredictionStatus, ReplicateClient};
use crate::request::{ChatCompletionResponse, ChatRequest, Usage};
use crate::response::ChunkBuilder;
use crate::stream::{LineSplitter, StreamAction, StreamNormalizer};

/// OpenAI-style chat completions on top of the predictions API
#[derive(Debug, Clone)]
pub struct ChatClient
{   provider: ReplicateClient
}

impl ChatClient
{   pub fn new(
      config: crate::config::ReplicateConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating ChatClient");
        Ok(ChatClient
        {   provider: ReplicateClient::new(config)?
        })
    }

    pub fn provider(&self) -> &ReplicateClient
    {   &self.provider
    }

    /// Submit, wait for the job, and return one completion
    pub async fn chat_completion(
      &self
    , request: ChatRequest
    ) -> Result<ChatCompletionResponse, crate::error::Error>
    {   debug!("chat_completion for model: {}", request.model);

        let mut body = crate::translate::to_prediction_request(&request);
        body.stream = false;
        let submitted = self.provider.submit(&body).await?;

        let prediction = if submitted.status == PredictionStatus::Succeeded
        {   submitted
        } else
        {   self.await_completion(&submitted.id).await?
        };

        let usage = crate::usage::usage_from_prediction(&prediction);
        Ok(crate::response::assemble_completion(
          &prediction
        , &request.model
        , usage
        ))
    }

    /// Poll with the configured policy until the job succeeds
    pub async fn await_completion(
      &self
    , prediction_id: &str
    ) -> Result<Prediction, crate::error::Error>
    {   let provider = &self.provider;
        crate::poller::await_completion(
          provider.config().poll.policy()
        , move || provider.fetch(prediction_id)
        ).await
    }

    /// One status fetch for final usage; never re-polls
    pub async fn final_usage(
      &self
    , prediction_id: &str
    ) -> Result<Usage, crate::error::Error>
    {   let provider = &self.provider;
        let outcome = crate::poller::poll(
          PollPolicy::single_shot()
        , move || provider.fetch(prediction_id)
        ).await?;

        match outcome
        {   PollOutcome::Succeeded(prediction) => {
              Ok(crate::usage::usage_from_prediction(&prediction))
            }
          , PollOutcome::Pending(prediction) => {
              warn!(
                "Prediction {} still {:?} after done event",
                prediction.id, prediction.status
              );
              Ok(crate::usage::usage_from_prediction(&prediction))
            }
        }
    }

    /// Submit a streaming job and return a receiver of chunks.
    ///
    /// Errors before the first chunk (submission, missing stream URL,
    /// stream open) are returned directly. After that the receiver
    /// yields deltas in arrival order, then exactly one terminal item:
    /// the stop chunk carrying usage, or an error (read failure, or a
    /// failed final status fetch). The channel closes right after it.
    pub async fn chat_completion_stream(
      &self
    , request: ChatRequest
    ) -> Result<crate::StreamReplyReceiver, crate::error::Error>
    {   debug!("chat_completion_stream for model: {}", request.model);

        let mut body = crate::translate::to_prediction_request(&request);
        body.stream = true;
        let submitted = self.provider.submit(&body).await?;

        let stream_url = self.provider
          .resolve_stream_url(&submitted)
          .await?;
        let response = self.provider.open_stream(&stream_url).await?;

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let session = StreamSession
        {   client: self.clone()
          , chunks: ChunkBuilder::new(&submitted.id, &request.model)
          , prediction_id: submitted.id
        };

        tokio::spawn(async move {
          run_stream_loop(session, response, reply_tx).await
        });

        Ok(reply_rx)
    }
}

/// Per-request state owned by the reader task
struct StreamSession
{   client: ChatClient
  , prediction_id: String
  , chunks: ChunkBuilder
}

/// Reader task: transport bytes in, chunks out
async fn run_stream_loop(
  mut session: StreamSession
, response: reqwest::Response
, reply: crate::StreamReplySender
)
{   debug!("Starting stream loop for {}", session.prediction_id);

    let mut body = Box::pin(response.bytes_stream());
    let mut lines = LineSplitter::new();
    let mut normalizer = StreamNormalizer::new();

    'read: loop
    {   let next = tokio::select!
        { item = body.next() => item
        , _ = reply.closed() => {
            info!(
              "Consumer dropped stream for {}",
              session.prediction_id
            );
            return;
          }
        };

        let mut actions = Vec::new();
        match next
        {   Some(Ok(bytes)) => {
              for line in lines.push(&bytes)
              {   actions.extend(normalizer.process_line(&line));
              }
            }
          , Some(Err(e)) => {
              error!(
                "Stream read error for {}: {}",
                session.prediction_id, e
              );
              let _ = reply.send(Err(
                crate::error::Error::StreamTransport(e.to_string())
              ));
              return;
            }
          , None => {
              debug!(
                "Stream for {} ended without done event",
                session.prediction_id
              );
              if let Some(line) = lines.finish()
              {   actions.extend(normalizer.process_line(&line));
              }
              actions.extend(normalizer.finish());
            }
        }

        for action in actions
        {   match action
            {   StreamAction::Text(text) => {
                  if reply.send(Ok(session.chunks.delta(text))).is_err()
                  {   debug!("Stream receiver gone");
                      return;
                  }
                }
              , StreamAction::Finish => break 'read
            }
        }
    }

    // Usage is only reliable once the transport is done with.
    drop(body);

    let usage = match session.client
      .final_usage(&session.prediction_id)
      .await
    {   Ok(usage) => usage
      , Err(e) => {
          error!(
            "Final status fetch for {} failed: {}",
            session.prediction_id, e
          );
          let _ = reply.send(Err(e));
          return;
        }
    };

    let _ = reply.send(Ok(session.chunks.stop(usage)));
    debug!("Stream for {} finished", session.prediction_id);
}
