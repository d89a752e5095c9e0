use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn};
use std::time::Duration;

// ===== Wire Types =====

/// Body of `POST /v1/predictions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest
{   pub stream: bool
  , pub input: PredictionInput
}

/// Job input in the backend's schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput
{   pub prompt: String
  , pub system_prompt: String
  , /// Backend accepts a single image only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>
  , pub max_tokens: u32
  , pub min_tokens: u32
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus
{   Starting
  , Processing
  , Succeeded
  , Failed
  , Canceled
  , #[serde(other)]
    Unknown
}

impl PredictionStatus
{   pub fn is_terminal(&self) -> bool
    {   matches!(
          self,
          PredictionStatus::Succeeded
            | PredictionStatus::Failed
            | PredictionStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionUrls
{   #[serde(default)]
    pub get: Option<String>
  , #[serde(default)]
    pub cancel: Option<String>
  , #[serde(default)]
    pub stream: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMetrics
{   #[serde(default)]
    pub input_token_count: Option<u64>
  , #[serde(default)]
    pub output_token_count: Option<u64>
  , #[serde(default)]
    pub predict_time: Option<f64>
}

/// Job output: token fragments, or one string for some models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput
{   Fragments(Vec<String>)
  , Text(String)
}

/// Read-only projection of a backend job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction
{   pub id: String
  , pub status: PredictionStatus
  , #[serde(default)]
    pub error: Option<serde_json::Value>
  , #[serde(default)]
    pub output: Option<PredictionOutput>
  , #[serde(default)]
    pub metrics: Option<PredictionMetrics>
  , #[serde(default)]
    pub urls: Option<PredictionUrls>
}

impl Prediction
{   /// Output fragments in arrival order
    pub fn fragments(&self) -> &[String]
    {   match &self.output
        {   Some(PredictionOutput::Fragments(parts)) => parts.as_slice()
          , Some(PredictionOutput::Text(text)) =>
              std::slice::from_ref(text)
          , None => &[]
        }
    }

    pub fn error_text(&self) -> String
    {   match &self.error
        {   Some(serde_json::Value::String(msg)) => msg.clone()
          , Some(serde_json::Value::Null) | None => String::new()
          , Some(other) => other.to_string()
        }
    }

    pub fn stream_url(&self) -> Option<&str>
    {   self.urls.as_ref()
          .and_then(|u| u.stream.as_deref())
          .filter(|u| !u.is_empty())
    }
}

// ===== Replicate Client =====

/// HTTP collaborator for the predictions API
#[derive(Debug, Clone)]
pub struct ReplicateClient
{   config: crate::config::ReplicateConfig
  , http_client: reqwest::Client
}

impl ReplicateClient
{   pub fn new(
      config: crate::config::ReplicateConfig
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating ReplicateClient for {}", config.api_base);
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.connect_timeout_secs
        {   builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          crate::error::Error::InvalidConfiguration(e.to_string())
        })?;

        Ok(ReplicateClient
        {   config
          , http_client
        })
    }

    pub fn config(&self) -> &crate::config::ReplicateConfig
    {   &self.config
    }

    fn get_api_key(&self) -> Result<&str, crate::error::Error>
    {   self.config.api_key.as_deref()
          .filter(|k| !k.is_empty())
          .ok_or_else(|| {
            error!("No API key for Replicate");
            crate::error::Error::MissingApiKey
          })
    }

    fn predictions_url(&self) -> String
    {   format!(
          "{}/v1/predictions",
          self.config.api_base.trim_end_matches('/')
        )
    }

    /// Create a job; one outbound call
    pub async fn submit(
      &self
    , request: &PredictionRequest
    ) -> Result<Prediction, crate::error::Error>
    {   let api_key = self.get_api_key()?;
        trace!("Replicate request: {:?}", request);

        let response = self.http_client
          .post(self.predictions_url())
          .header("Authorization", format!("Token {}", api_key))
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error on submit: {}", e);
            crate::error::Error::Submission
            {   status: None
              , body: e.to_string()
            }
          })?;

        let status = response.status();
        trace!("Replicate submit status: {}", status);

        if !status.is_success()
        {   let body = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Replicate submit error {}: {}", status, body);
            return Err(crate::error::Error::Submission
            {   status: Some(status.as_u16())
              , body
            });
        }

        let prediction: Prediction
          = response.json().await.map_err(|e| {
            error!("Parse error on submit: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        debug!(
          "Submitted prediction {} ({:?})",
          prediction.id, prediction.status
        );
        Ok(prediction)
    }

    /// `GET /v1/predictions/{id}`, exactly once
    pub async fn fetch(
      &self
    , prediction_id: &str
    ) -> Result<Prediction, crate::error::Error>
    {   let api_key = self.get_api_key()?;

        let response = self.http_client
          .get(format!("{}/{}", self.predictions_url(), prediction_id))
          .header("Authorization", format!("Token {}", api_key))
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error on fetch: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Replicate fetch status: {}", status);

        if !status.is_success()
        {   let message = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Replicate fetch error {}: {}", status, message);
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , message
            });
        }

        response.json().await.map_err(|e| {
          error!("Parse error on fetch: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }

    /// Subscription URL, with one status fetch when submission omitted it
    pub async fn resolve_stream_url(
      &self
    , prediction: &Prediction
    ) -> Result<String, crate::error::Error>
    {   if let Some(url) = prediction.stream_url()
        {   return Ok(url.to_string());
        }

        warn!(
          "Prediction {} has no stream URL, refetching",
          prediction.id
        );
        let refreshed = self.fetch(&prediction.id).await?;
        refreshed.stream_url()
          .map(str::to_string)
          .ok_or_else(|| {
            error!("Missing stream URL for {}", prediction.id);
            crate::error::Error::MissingStreamUrl(prediction.id.clone())
          })
    }

    /// Open the SSE subscription; body is read by the caller
    pub async fn open_stream(
      &self
    , stream_url: &str
    ) -> Result<reqwest::Response, crate::error::Error>
    {   debug!("Opening event stream: {}", stream_url);

        let response = self.http_client
          .get(stream_url)
          .header("Accept", "text/event-stream")
          .header("Cache-Control", "no-store")
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error on stream open: {}", e);
            crate::error::Error::StreamTransport(e.to_string())
          })?;

        let status = response.status();
        if !status.is_success()
        {   let message = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Stream request error {}: {}", status, message);
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , message
            });
        }

        Ok(response)
    }
}
