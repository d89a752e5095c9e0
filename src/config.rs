//! Configuration for the Replicate backend and polling behavior

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str
  = "https://api.replicate.com";

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig
{   /// Max status fetches before giving up
    pub max_attempts: usize
  , /// Sleep between fetches in milliseconds
    pub interval_ms: u64
}

impl PollConfig
{   pub fn policy(&self) -> crate::poller::PollPolicy
    {   crate::poller::PollPolicy::new(
          self.max_attempts
        , Duration::from_millis(self.interval_ms)
        )
    }
}

impl Default for PollConfig
{   fn default() -> Self
    {   PollConfig
        {   max_attempts: 30
          , interval_ms: 1000
        }
    }
}

/// Replicate backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig
{   /// API base URL, without the /v1 suffix
    pub api_base: String
  , /// API token, sent as `Authorization: Token <key>`
    pub api_key: Option<String>
  , /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>
  , /// Polling configuration
    #[serde(default)]
    pub poll: PollConfig
}

impl ReplicateConfig
{   pub fn new(api_key: impl Into<String>) -> Self
    {   ReplicateConfig
        {   api_key: Some(api_key.into())
          , ..ReplicateConfig::default()
        }
    }

    /// Build from `REPLICATE_API_TOKEN` and `REPLICATE_API_BASE`
    pub fn from_env() -> Self
    {   let mut config = ReplicateConfig::default();
        if let Ok(key) = std::env::var("REPLICATE_API_TOKEN")
        {   config.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("REPLICATE_API_BASE")
        {   config.api_base = base;
        }
        config
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self
    {   self.api_base = api_base.into();
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self
    {   self.poll = poll;
        self
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.api_base.trim().is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "api_base is empty".to_string()
            ));
        }
        if self.poll.max_attempts == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "poll.max_attempts must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

impl Default for ReplicateConfig
{   fn default() -> Self
    {   ReplicateConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , api_key: None
          , connect_timeout_secs: Some(10)
          , poll: PollConfig::default()
        }
    }
}
