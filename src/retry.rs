use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

use crate::error::{FeedError, FeedResult};

/// Configuration for reconnect-and-retry around database operations.
///
/// Delays are specified in milliseconds for serialization compatibility.
#[derive(Clone, Debug, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first one.
    ///
    /// Default: 5
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    ///
    /// Default: 500ms
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between attempts.
    ///
    /// Default: 30000ms
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt. Must be >= 1.0.
    ///
    /// Default: 2.0
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> FeedResult<()> {
        if self.max_attempts == 0 {
            return Err(FeedError::Config(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(FeedError::Config(
                "retry.backoff_multiplier must be >= 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Returns `true` while another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32, error: &FeedError) -> bool {
        error.is_connection_retryable() && attempt < self.max_attempts
    }

    /// Calculates the delay to wait after failed attempt number `attempt` (1-indexed).
    ///
    /// Uses exponential backoff: `initial * multiplier^(attempt - 1)`, capped at
    /// `max_delay_ms`, plus up to 30% random jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped_delay_ms = base_delay_ms.min(self.max_delay_ms as f64);

        let jitter_factor = rand::thread_rng().gen::<f64>() * 0.3;
        Duration::from_millis((capped_delay_ms * (1.0 + jitter_factor)) as u64)
    }
}
