use std::fmt;

/// Custom error type for bridge operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Job creation failed; status is None on transport failure
    Submission
    {   status: Option<u16>
      , body: String
    }
  , /// Backend reported the job as failed or canceled
    PredictionFailed(String)
  , /// Attempt ceiling exhausted without a terminal status
    PollingTimeout(usize)
  , /// Read failure in the middle of an event stream
    StreamTransport(String)
  , /// API key is missing
    MissingApiKey
  , /// Job has no subscription URL for event streaming
    MissingStreamUrl(String)
  , /// HTTP request error
    HttpError(String)
  , /// Backend returned a non-success status outside of submission
    ApiError
    {   status: u16
      , message: String
    }
  , /// Failed to parse backend response
    ParseError(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
}

impl Error
{   /// HTTP-equivalent status for surfacing to the inbound caller
    pub fn status_code(&self) -> u16
    {   match self
        {   Error::Submission { status: Some(status), .. } => *status
          , Error::Submission { status: None, .. } => 502
          , Error::PredictionFailed(_) => 502
          , Error::PollingTimeout(_) => 504
          , Error::StreamTransport(_) => 502
          , Error::MissingApiKey => 401
          , Error::ApiError { status, .. } => *status
          , Error::HttpError(_) => 502
          , Error::MissingStreamUrl(_)
          | Error::ParseError(_)
          | Error::InvalidConfiguration(_) => 500
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str
    {   match self
        {   Error::Submission { .. } => "submission_error"
          , Error::PredictionFailed(_) => "prediction_failed"
          , Error::PollingTimeout(_) => "polling_timeout"
          , Error::StreamTransport(_) => "stream_transport_error"
          , Error::MissingApiKey => "missing_api_key"
          , Error::MissingStreamUrl(_) => "missing_stream_url"
          , Error::HttpError(_) => "send_request_error"
          , Error::ApiError { .. } => "api_error"
          , Error::ParseError(_) => "decode_error"
          , Error::InvalidConfiguration(_) => "invalid_configuration"
        }
    }

    /// Structured OpenAI-style error body
    pub fn to_error_response(&self) -> crate::request::ErrorResponse
    {   crate::request::ErrorResponse
        {   error: crate::request::ErrorBody
            {   message: self.to_string()
              , kind: "replicate_error".to_string()
              , code: self.code().to_string()
            }
          , status: self.status_code()
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Submission { status: Some(status), body } => {
              write!(f,
                "API request error, status: {}, message: {}",
                status, body
              )
            }
          , Error::Submission { status: None, body } => {
              write!(f, "Failed to submit prediction: {}", body)
            }
          , Error::PredictionFailed(msg) => {
              write!(f, "Prediction failed or canceled: {}", msg)
            }
          , Error::PollingTimeout(attempts) => {
              write!(f,
                "Polling timeout after {} attempts",
                attempts
              )
            }
          , Error::StreamTransport(msg) => {
              write!(f, "Stream read error: {}", msg)
            }
          , Error::MissingApiKey => {
              write!(f, "Missing API key for Replicate")
            }
          , Error::MissingStreamUrl(id) => {
              write!(f, "Missing stream URL for prediction: {}", id)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f,
                "API error, status: {}, message: {}",
                status, message
              )
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn submission_passes_backend_status_through()
    {   let err = Error::Submission
        {   status: Some(422)
          , body: "{\"detail\":\"bad input\"}".to_string()
        };
        assert_eq!(err.status_code(), 422);
        let body = err.to_error_response();
        assert_eq!(body.status, 422);
        assert_eq!(body.error.code, "submission_error");
        assert!(body.error.message.contains("bad input"));
    }

    #[test]
    fn timeout_maps_to_gateway_timeout()
    {   let err = Error::PollingTimeout(30);
        assert_eq!(err.status_code(), 504);
        assert_eq!(
          err.to_string(),
          "Polling timeout after 30 attempts"
        );
    }
}
