//! Token usage from terminal job snapshots

use crate::providers::replicate::Prediction;
use crate::request::Usage;

/// Usage for a job snapshot; all-zero when the backend reports no metrics
pub fn usage_from_prediction(prediction: &Prediction) -> Usage
{   match &prediction.metrics
    {   Some(metrics) => Usage::new(
          metrics.input_token_count.unwrap_or(0)
        , metrics.output_token_count.unwrap_or(0)
        )
      , None => Usage::default()
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::providers::replicate::{PredictionMetrics, PredictionStatus};

    fn completed(metrics: Option<PredictionMetrics>) -> Prediction
    {   Prediction
        {   id: "p1".to_string()
          , status: PredictionStatus::Succeeded
          , error: None
          , output: None
          , metrics
          , urls: None
        }
    }

    #[test]
    fn total_is_input_plus_output()
    {   let usage = usage_from_prediction(&completed(Some(PredictionMetrics
        {   input_token_count: Some(12)
          , output_token_count: Some(34)
          , predict_time: Some(1.5)
        })));
        assert_eq!(usage, Usage
        {   prompt_tokens: 12
          , completion_tokens: 34
          , total_tokens: 46
        });
    }

    #[test]
    fn missing_metrics_report_zero()
    {   assert_eq!(usage_from_prediction(&completed(None)), Usage::default());

        let partial = completed(Some(PredictionMetrics
        {   input_token_count: Some(7)
          , ..PredictionMetrics::default()
        }));
        assert_eq!(usage_from_prediction(&partial), Usage::new(7, 0));
    }
}
