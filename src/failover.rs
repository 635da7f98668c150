//! Retry policy for the completion capability

use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::config::RetryConfig;

/// Retry policy for failed completion attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub initial_delay: Duration
  , pub backoff_multiplier: f32
  , pub max_delay: Duration
  , pub jitter: f32
  , pub attempt_timeout: Duration
  , pub fallback_enabled: bool
}

impl RetryPolicy
{   /// Create a new retry policy with the given budget and delay
    ///
    /// The delay stays flat and jitter-free; use the builder methods
    /// to switch on exponential growth.
    pub fn new(
      max_attempts: usize
    , initial_delay_ms: u64
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , initial_delay: Duration::from_millis(initial_delay_ms)
          , backoff_multiplier: 1.0
          , max_delay: Duration::from_millis(initial_delay_ms)
          , jitter: 0.0
          , attempt_timeout: Duration::from_secs(30)
          , fallback_enabled: true
        }
    }

    pub fn with_backoff(
      mut self
    , multiplier: f32
    , max_delay: Duration
    ) -> Self
    {   self.backoff_multiplier = multiplier.max(1.0);
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f32) -> Self
    {   self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self
    {   self.attempt_timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self
    {   self.fallback_enabled = enabled;
        self
    }

    /// Delay to sleep before `attempt` (1-based). Zero for the first.
    pub fn delay_before_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   if attempt <= 1
        {   return Duration::ZERO;
        }
        let retry = (attempt - 2) as i32;
        let base_ms = self.initial_delay.as_millis() as f64
          * (self.backoff_multiplier as f64).powi(retry);
        let capped_ms = base_ms.min(
          self.max_delay.max(self.initial_delay).as_millis() as f64
        );
        let delay_ms = if self.jitter > 0.0
        {   let j = self.jitter as f64;
            let factor = rand::thread_rng().gen_range((1.0 - j)..=(1.0 + j));
            capped_ms * factor
        } else
        {   capped_ms
        };
        debug!(
          "Delay before attempt {}: {:.0}ms",
          attempt, delay_ms
        );
        Duration::from_millis(delay_ms.max(0.0) as u64)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy
{   fn from(config: &RetryConfig) -> Self
    {   RetryPolicy::new(config.max_attempts, config.initial_delay_ms)
          .with_backoff(
            config.backoff_multiplier,
            Duration::from_millis(config.max_delay_ms)
          )
          .with_jitter(config.jitter)
          .with_attempt_timeout(
            Duration::from_secs(config.attempt_timeout_secs)
          )
          .with_fallback(config.fallback_enabled)
    }
}
