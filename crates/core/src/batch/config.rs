//! Batch orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Submission worker pool size. A fixed pool, not one task per
    /// sequence, so submission pressure stays bounded.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// How often the poller sweeps outstanding jobs (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Poll budget per job before it is forced to a timeout failure.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Retry behavior for transient submission failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum submission attempts per sequence.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between attempts in seconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Maximum delay between attempts in seconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before re-attempting after the given 1-based failed attempt,
    /// capped at `max_delay_secs`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let secs = self.initial_delay_secs as f64 * self.backoff_multiplier.powi(exponent as i32);
        Duration::from_secs_f64(secs.min(self.max_delay_secs as f64))
    }
}

fn default_worker_count() -> usize {
    5
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_poll_attempts() -> u32 {
    360 // one hour at the default interval
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> u64 {
    5
}

fn default_max_delay() -> u64 {
    60
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            poll_interval_ms: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}
