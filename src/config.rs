//! Runtime configuration for the reconciliation layer
//!
//! Time budgets, backoff, polling, and rate limiting, loadable from YAML.
//! Every field has a default, so an empty document is a valid config.

use crate::error::{Error, Result};
use crate::loader::ResourceDefinition;
use crate::retry::{Backoff, RateLimiter, RateLimiterConfig, RetryExecutor, RetryPolicy};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete reconciliation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Retry budgets and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Convergence polling
    #[serde(default)]
    pub wait: WaitConfig,

    /// Per-action rate limit; unlimited when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimiterConfig>,

    /// Timeout overrides keyed by resource type name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub resources: HashMap<String, TimeoutOverrides>,
}

impl ReconcileConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that budgets and intervals are usable
    pub fn validate(&self) -> Result<()> {
        let backoff = &self.retry.backoff;
        if backoff.initial_ms == 0 {
            return Err(Error::config("retry.backoff.initial_ms must be positive"));
        }
        if backoff.max_ms < backoff.initial_ms {
            return Err(Error::config(format!(
                "retry.backoff.max_ms ({}) is below initial_ms ({})",
                backoff.max_ms, backoff.initial_ms
            )));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(Error::config("wait.poll_interval_ms must be positive"));
        }
        if let Some(limit) = &self.rate_limit {
            if limit.requests_per_second == 0 {
                return Err(Error::config("rate_limit.requests_per_second must be positive"));
            }
        }
        Ok(())
    }

    /// Backoff schedule shared by every policy
    pub fn backoff(&self) -> Backoff {
        let backoff = &self.retry.backoff;
        Backoff::new(
            backoff.backoff_type,
            Duration::from_millis(backoff.initial_ms),
            Duration::from_millis(backoff.max_ms),
        )
    }

    /// Delay between convergence probes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait.poll_interval_ms)
    }

    /// Read budget for a resource type.
    ///
    /// Overrides in this config win over the definition's own, which win
    /// over the global budget.
    pub fn read_timeout(&self, definition: &ResourceDefinition) -> Duration {
        let ms = self
            .resources
            .get(&definition.name)
            .and_then(|o| o.read_timeout_ms)
            .or(definition.timeouts.read_timeout_ms)
            .unwrap_or(self.retry.read_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Write budget for a resource type, resolved like [`read_timeout`](Self::read_timeout)
    pub fn write_timeout(&self, definition: &ResourceDefinition) -> Duration {
        let ms = self
            .resources
            .get(&definition.name)
            .and_then(|o| o.write_timeout_ms)
            .or(definition.timeouts.write_timeout_ms)
            .unwrap_or(self.retry.write_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Retry policy for describe and probe calls
    pub fn read_policy(&self, definition: &ResourceDefinition) -> RetryPolicy {
        self.policy(self.read_timeout(definition))
    }

    /// Retry policy for create, modify, and delete calls
    pub fn write_policy(&self, definition: &ResourceDefinition) -> RetryPolicy {
        self.policy(self.write_timeout(definition))
    }

    fn policy(&self, max_elapsed: Duration) -> RetryPolicy {
        RetryPolicy::new(max_elapsed)
            .with_backoff(self.backoff())
            .retry_codes(self.retry.retryable_codes.iter().cloned())
    }

    /// Build an executor, rate limited when configured
    pub fn executor(&self) -> RetryExecutor {
        match &self.rate_limit {
            Some(limit) => RetryExecutor::with_rate_limiter(RateLimiter::new(limit)),
            None => RetryExecutor::new(),
        }
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry budgets and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Budget for describe and probe calls in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Budget for create, modify, and delete calls in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Delay schedule between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Vendor codes treated as transient in addition to the defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retryable_codes: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            backoff: BackoffConfig::default(),
            retryable_codes: Vec::new(),
        }
    }
}

fn default_read_timeout_ms() -> u64 {
    3 * 60 * 1000
}

fn default_write_timeout_ms() -> u64 {
    5 * 60 * 1000
}

/// Backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Backoff strategy
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Delay after the first failure in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Upper bound for any delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::default(),
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    10_000
}

// ============================================================================
// Wait Config
// ============================================================================

/// Convergence polling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Delay between status probes in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

// ============================================================================
// Timeout Overrides
// ============================================================================

/// Per-resource replacement for the global budgets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout_ms: Option<u64>,
}
