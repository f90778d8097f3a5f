//! Bounded exponential backoff for work-item retries

use std::time::Duration;

/// Retry schedule for one work item
///
/// Attempt `n` (1-based) that fails is followed by a sleep of
/// `min(initial_backoff * multiplier^(n-1), max_backoff)`. There is no sleep
/// after the final attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff after the first failure
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff
    pub max_backoff: Duration,
    /// Growth factor between consecutive backoffs
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy with no backoff between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Sleep after failed attempt `attempt`, or `None` if it was the last one
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.initial_backoff.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_nanos() as f64).max(0.0);
        Some(Duration::from_nanos(capped.round() as u64))
    }

    /// Check whether another attempt follows `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
