//! Backoff delay calculation
//!
//! Shared by the retry executor and the convergence waiter.

use crate::types::BackoffType;
use std::time::Duration;

/// Smallest delay ever returned, so a retry loop can never spin
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Delay before the second attempt
    pub initial: Duration,
    /// Upper bound for any delay
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// Create a backoff schedule
    pub fn new(backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        Self {
            backoff_type,
            initial,
            max,
        }
    }

    /// Fixed delay between attempts
    pub fn constant(delay: Duration) -> Self {
        Self::new(BackoffType::Constant, delay, delay)
    }

    /// Delay growing by `initial` per attempt, capped at `max`
    pub fn linear(initial: Duration, max: Duration) -> Self {
        Self::new(BackoffType::Linear, initial, max)
    }

    /// Delay doubling per attempt, capped at `max`
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self::new(BackoffType::Exponential, initial, max)
    }

    /// Delay to wait after the given zero-based failed attempt.
    ///
    /// Non-decreasing in `attempt`, never zero, never above `max`
    /// (unless `max` itself is below the 1ms floor).
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => Some(self.initial),
            BackoffType::Linear => self.initial.checked_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial.checked_mul(factor)
            }
        };

        let capped = delay.map_or(self.max, |d| std::cmp::min(d, self.max));
        std::cmp::max(capped, MIN_DELAY)
    }
}
