//! Delivery queue and worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for notification creation defaults and the delivery worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Whether the delivery worker is started with the server.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How long the worker waits on an empty queue before polling again.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Pause between two processed items.
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,
    /// `maxRetries` assigned when a create request does not specify one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    /// Upper bound accepted for a caller-supplied `maxRetries`.
    #[serde(default = "default_retry_ceiling")]
    pub max_retries_ceiling: u32,
    /// Lifetime of a notification before it expires undelivered.
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: i64,
    /// Backoff between failed attempts.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval(),
            pacing_ms: default_pacing(),
            default_max_retries: default_max_retries(),
            max_retries_ceiling: default_retry_ceiling(),
            expiry_hours: default_expiry_hours(),
            retry: RetryConfig::default(),
        }
    }
}

impl DeliveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expiry_hours)
    }
}

/// Retry strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Constant delay between attempts.
    #[default]
    Fixed,
    /// `delay * 2^(attempt - 1)` capped at `max_delay_seconds`.
    Exponential,
}

/// Backoff configuration for failed deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub strategy: RetryStrategy,
    /// Fixed delay, or the base delay for exponential backoff.
    #[serde(default = "default_retry_delay")]
    pub delay_seconds: u64,
    /// Cap for exponential backoff.
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
    /// Randomize exponential delays by up to +/-20%.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            delay_seconds: default_retry_delay(),
            max_delay_seconds: default_max_delay(),
            jitter: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_pacing() -> u64 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_ceiling() -> u32 {
    10
}

fn default_expiry_hours() -> i64 {
    24
}

fn default_retry_delay() -> u64 {
    5 * 60
}

fn default_max_delay() -> u64 {
    60 * 60
}
