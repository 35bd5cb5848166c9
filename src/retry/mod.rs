//! Retry module
//!
//! Executes a single remote call repeatedly under a bounded time budget.
//!
//! # Features
//!
//! - **Classification**: every failure is either retryable or fatal
//! - **Time Budget**: retries stop once `max_elapsed` is spent; the last
//!   transient error is returned wrapped in `RetryBudgetExhausted`
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Rate Limiting**: Per-action token bucket using governor

mod backoff;
mod executor;
mod policy;
mod rate_limit;

pub use backoff::Backoff;
pub use executor::RetryExecutor;
pub use policy::{
    Classification, Classifier, RetryPolicy, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
