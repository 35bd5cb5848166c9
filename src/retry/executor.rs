//! Bounded-time retry loop
//!
//! Runs a remote call on the calling thread until it succeeds, fails
//! fatally, or the policy's time budget is spent. Sleeps between attempts
//! block the thread.

use super::policy::{Classification, RetryPolicy};
use super::rate_limit::RateLimiter;
use crate::error::{Error, Result};
use std::time::Instant;
use tracing::{debug, warn};

/// Executes remote calls under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    rate_limiter: Option<RateLimiter>,
}

impl RetryExecutor {
    /// Create an executor without rate limiting
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor that throttles every attempt per action
    pub fn with_rate_limiter(rate_limiter: RateLimiter) -> Self {
        Self {
            rate_limiter: Some(rate_limiter),
        }
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Run `op` until success, a fatal error, or budget exhaustion
    pub fn execute<T, F>(&self, policy: &RetryPolicy, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        self.run(None, policy, op)
    }

    /// Like [`execute`](Self::execute), acquiring a rate-limit permit for
    /// `action` before every attempt
    pub fn execute_action<T, F>(&self, action: &str, policy: &RetryPolicy, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        self.run(Some(action), policy, op)
    }

    fn run<T, F>(&self, action: Option<&str>, policy: &RetryPolicy, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let started = Instant::now();
        let label = action.unwrap_or("call");
        let mut attempt: u32 = 0;

        loop {
            if let (Some(limiter), Some(action)) = (&self.rate_limiter, action) {
                limiter.wait(action);
            }

            attempt += 1;
            let err = match op() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if policy.classify(&err) == Classification::Fatal {
                debug!("{} failed fatally on attempt {}: {}", label, attempt, err);
                return Err(err);
            }

            let elapsed = started.elapsed();
            if elapsed >= policy.max_elapsed {
                warn!(
                    "{} still failing after {} attempts in {:?}, giving up: {}",
                    label, attempt, elapsed, err
                );
                return Err(Error::budget_exhausted(
                    attempt,
                    elapsed,
                    policy.max_elapsed,
                    err,
                ));
            }

            let remaining = policy.max_elapsed - elapsed;
            let delay = std::cmp::min(policy.backoff.delay(attempt - 1), remaining);
            warn!(
                "{} failed with retryable error, attempt {}, retrying in {:?}: {}",
                label, attempt, delay, err
            );
            std::thread::sleep(delay);
        }
    }
}
