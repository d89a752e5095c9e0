//! Status polling for submitted predictions

use std::future::Future;
use std::time::Duration;
use log::{debug, trace};
use crate::providers::replicate::{Prediction, PredictionStatus};

/// How many times to fetch, and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy
{   pub max_attempts: usize
  , pub interval: Duration
}

impl PollPolicy
{   pub fn new(
      max_attempts: usize
    , interval: Duration
    ) -> Self
    {   PollPolicy
        {   max_attempts
          , interval
        }
    }

    /// Fetch once, never sleep
    pub fn single_shot() -> Self
    {   PollPolicy::new(1, Duration::ZERO)
    }
}

impl Default for PollPolicy
{   fn default() -> Self
    {   PollPolicy::new(30, Duration::from_secs(1))
    }
}

/// Result of a polling run that did not error
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome
{   /// Job reached `succeeded`
    Succeeded(Prediction)
  , /// Ceiling reached; last snapshot fetched
    Pending(Prediction)
}

/// Fetch until terminal or the attempt ceiling is hit.
///
/// `failed`/`canceled` end the run with `PredictionFailed`. With a
/// ceiling of 1 this is a plain status fetch with the same status
/// interpretation.
pub async fn poll<F, Fut>(
  policy: PollPolicy
, mut fetch: F
) -> Result<PollOutcome, crate::error::Error>
where
  F: FnMut() -> Fut
, Fut: Future<Output = Result<Prediction, crate::error::Error>>
{   let mut last = None;

    for attempt in 1..=policy.max_attempts
    {   let prediction = fetch().await?;
        trace!(
          "Poll attempt {}/{}: {} is {:?}",
          attempt, policy.max_attempts, prediction.id, prediction.status
        );

        match prediction.status
        {   PredictionStatus::Succeeded => {
              debug!(
                "Prediction {} succeeded after {} fetches",
                prediction.id, attempt
              );
              return Ok(PollOutcome::Succeeded(prediction));
            }
          , PredictionStatus::Failed | PredictionStatus::Canceled => {
              debug!(
                "Prediction {} ended as {:?}",
                prediction.id, prediction.status
              );
              return Err(crate::error::Error::PredictionFailed(
                prediction.error_text()
              ));
            }
          , _ => {}
        }

        last = Some(prediction);
        if attempt < policy.max_attempts
        {   tokio::time::sleep(policy.interval).await;
        }
    }

    match last
    {   Some(prediction) => Ok(PollOutcome::Pending(prediction))
      , None => Err(crate::error::Error::PollingTimeout(0))
    }
}

/// Poll until `succeeded`; running out of attempts is `PollingTimeout`
pub async fn await_completion<F, Fut>(
  policy: PollPolicy
, fetch: F
) -> Result<Prediction, crate::error::Error>
where
  F: FnMut() -> Fut
, Fut: Future<Output = Result<Prediction, crate::error::Error>>
{   match poll(policy, fetch).await?
    {   PollOutcome::Succeeded(prediction) => Ok(prediction)
      , PollOutcome::Pending(prediction) => {
          debug!(
            "Prediction {} still {:?} after {} attempts",
            prediction.id, prediction.status, policy.max_attempts
          );
          Err(crate::error::Error::PollingTimeout(policy.max_attempts))
        }
    }
}
