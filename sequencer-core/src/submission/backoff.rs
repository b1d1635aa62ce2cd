//! Linear retry backoff.
//!
//! The schedule is pinned exactly: between attempts `k` and `k+1`,
//! sleep `backoff_ms * k`. Deliberately not an exponential-with-jitter
//! scheme — retry timing here is part of an externally observable
//! contract pinned to a specific attempt count, so it stays linear and
//! jitter-free.

use std::time::Duration;

/// Configuration for the submission pipeline's linear backoff.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Base delay unit in milliseconds. Floor is 50ms.
    pub backoff_ms: u64,
    /// Maximum number of attempts. Floor is 1.
    pub max_retries: usize,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_ms: 200,
            max_retries: 5,
        }
    }
}

impl BackoffConfig {
    /// Clamp to the required floors: `backoff_ms >= 50`,
    /// `max_retries >= 1`.
    pub fn clamped(backoff_ms: u64, max_retries: usize) -> Self {
        Self {
            backoff_ms: backoff_ms.max(50),
            max_retries: max_retries.max(1),
        }
    }

    /// Delay before attempt `next_attempt` (1-indexed), i.e. the sleep
    /// between attempt `next_attempt - 1` and `next_attempt`.
    pub fn delay_before_attempt(&self, next_attempt: usize) -> Duration {
        let k = next_attempt.saturating_sub(1) as u64;
        Duration::from_millis(self.backoff_ms * k)
    }
}
