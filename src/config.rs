//! Configuration for the completion provider, retries and rendering

use std::path::Path;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variables checked for the provider key, in order
pub const API_KEY_ENV_VARS: [&str; 2]
  = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// API base URL
    pub api_base: String
  , /// Model used when a task carries no hint
    pub model: String
  , /// HTTP request timeout in seconds
    pub timeout_secs: u64
  , /// Sampling temperature
    pub temperature: f32
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , model: DEFAULT_MODEL.to_string()
          , timeout_secs: 60
          , temperature: 0.7
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   /// Total attempts including the first one
    pub max_attempts: usize
  , /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64
  , /// Backoff multiplier applied per further retry; 1.0 keeps it flat
    pub backoff_multiplier: f32
  , /// Upper bound on a single delay in milliseconds
    pub max_delay_ms: u64
  , /// Symmetric jitter fraction in [0, 1]
    pub jitter: f32
  , /// Time budget for one completion call in seconds
    pub attempt_timeout_secs: u64
  , /// Substitute the task fallback once attempts run out
    pub fallback_enabled: bool
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   max_attempts: 3
          , initial_delay_ms: 1000
          , backoff_multiplier: 1.0
          , max_delay_ms: 8000
          , jitter: 0.0
          , attempt_timeout_secs: 30
          , fallback_enabled: true
        }
    }
}

/// Limits applied when compiling generated component source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig
{   pub max_source_bytes: usize
  , pub max_depth: usize
  , pub max_nodes: usize
  , /// Wall-clock budget for one compile in milliseconds
    pub time_budget_ms: u64
}

impl Default for RenderConfig
{   fn default() -> Self
    {   RenderConfig
        {   max_source_bytes: 64 * 1024
          , max_depth: 64
          , max_nodes: 5000
          , time_budget_ms: 250
        }
    }
}

/// Craftify configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraftConfig
{   pub provider: ProviderConfig
  , pub retry: RetryConfig
  , pub render: RenderConfig
}

impl CraftConfig
{   /// Parse and validate a JSON configuration document
    pub fn from_json_str(s: &str) -> Result<Self, Error>
    {   let config: CraftConfig = serde_json::from_str(s)
          .map_err(|e| {
            error!("Bad configuration: {}", e);
            Error::InvalidConfiguration(e.to_string())
          })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P)
      -> Result<Self, Error>
    {   let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)
          .map_err(|e| {
            Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        Self::from_json_str(&raw)
    }

    /// First non-empty key among the supported env variables
    pub fn api_key_from_env() -> Option<String>
    {   API_KEY_ENV_VARS.iter()
          .filter_map(|var| std::env::var(var).ok())
          .find(|key| !key.trim().is_empty())
    }

    pub fn validate(&self) -> Result<(), Error>
    {   let retry = &self.retry;
        if retry.max_attempts == 0
        {   return Err(Error::InvalidConfiguration(
              "retry.max_attempts must be at least 1".to_string()
            ));
        }
        if retry.backoff_multiplier < 1.0
        {   return Err(Error::InvalidConfiguration(
              "retry.backoff_multiplier must be >= 1.0".to_string()
            ));
        }
        if !(0.0..=1.0).contains(&retry.jitter)
        {   return Err(Error::InvalidConfiguration(
              "retry.jitter must be within [0, 1]".to_string()
            ));
        }
        if retry.attempt_timeout_secs == 0
        {   return Err(Error::InvalidConfiguration(
              "retry.attempt_timeout_secs must be non-zero".to_string()
            ));
        }
        let render = &self.render;
        if render.max_source_bytes == 0
          || render.max_depth == 0
          || render.max_nodes == 0
          || render.time_budget_ms == 0
        {   return Err(Error::InvalidConfiguration(
              "render limits must be non-zero".to_string()
            ));
        }
        if self.provider.model.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "provider.model must not be empty".to_string()
            ));
        }
        Ok(())
    }
}
