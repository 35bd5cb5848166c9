//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting, keyed by the
//! remote action name so each API action gets its own bucket.

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per second, per action
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    /// Burst size (max tokens in bucket)
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    20
}

fn default_burst() -> u32 {
    20
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst_size: default_burst(),
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }
}

/// Per-action token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            limiter: Arc::new(Governor::keyed(quota)),
            clock: DefaultClock::default(),
        }
    }

    /// Block the calling thread until `action` may be called
    pub fn wait(&self, action: &str) {
        let key = action.to_string();
        while let Err(not_until) = self.limiter.check_key(&key) {
            std::thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }

    /// Try to acquire a permit for `action`, returning immediately
    pub fn try_acquire(&self, action: &str) -> bool {
        self.limiter.check_key(&action.to_string()).is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.requests_per_second, 20);
        assert_eq!(config.burst_size, 20);
    }

    #[test]
    fn test_rate_limiter_allows_burst() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(10, 5));

        for _ in 0..5 {
            assert!(limiter.try_acquire("DescribeInstances"));
        }
        assert!(!limiter.try_acquire("DescribeInstances"));
    }

    #[test]
    fn test_rate_limiter_keys_are_independent() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 1));

        assert!(limiter.try_acquire("CreateInstance"));
        assert!(!limiter.try_acquire("CreateInstance"));
        assert!(limiter.try_acquire("DeleteInstance"));
    }

    #[test]
    fn test_rate_limiter_wait_blocks_until_refill() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(20, 1));

        let started = Instant::now();
        limiter.wait("ModifyInstance");
        limiter.wait("ModifyInstance");
        // second permit refills after ~50ms at 20 rps
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_config_falls_back_to_one() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        assert!(limiter.try_acquire("x"));
    }
}
