//! Backoff between failed delivery attempts.

use std::time::Duration;

use rand::Rng;

use notifyhub_core::config::delivery::{RetryConfig, RetryStrategy};

/// Share of the delay that jitter may add or remove.
const JITTER_RATIO: f64 = 0.2;

/// Computes how long a failed notification waits before its next attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            strategy: config.strategy,
            delay: Duration::from_secs(config.delay_seconds),
            max_delay: Duration::from_secs(config.max_delay_seconds.max(config.delay_seconds)),
            jitter: config.jitter,
        }
    }

    /// Same delay before every retry.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            delay,
            max_delay: delay,
            jitter: false,
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.strategy {
            RetryStrategy::Fixed => self.delay,
            RetryStrategy::Exponential => {
                let exponent = retry.saturating_sub(1).min(31);
                let base = self
                    .delay
                    .saturating_mul(1u32 << exponent)
                    .min(self.max_delay);
                if self.jitter {
                    let factor = rand::thread_rng().gen_range(1.0 - JITTER_RATIO..=1.0 + JITTER_RATIO);
                    base.mul_f64(factor).min(self.max_delay)
                } else {
                    base
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
