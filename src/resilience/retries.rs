//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether an upstream outcome is retryable
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Connection errors, 429 and every 5xx are retryable
//! - Other 4xx are permanent and returned immediately
//! - Total latency is bounded by attempts and delay cap, not by cancellation

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::RetryConfig;
use crate::resilience::backoff::{calculate_backoff, with_jitter};

/// Returns true if the outcome of an attempt warrants another one.
///
/// `status` is `None` when the attempt failed before a response arrived,
/// which is always retryable.
pub fn is_retryable(status: Option<StatusCode>) -> bool {
    match status {
        Some(s) => s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error(),
        None => true,
    }
}

/// Retry policy applied to each outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = calculate_backoff(
            attempt,
            self.base_delay.as_millis() as u64,
            self.max_delay.as_millis() as u64,
        );
        if self.jitter {
            with_jitter(delay)
        } else {
            delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}
