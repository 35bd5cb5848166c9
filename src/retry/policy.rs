//! Retry policy and error classification

use super::backoff::Backoff;
use crate::error::{code_matches, Error};
use std::sync::Arc;
use std::time::Duration;

/// Default budget for read calls (describe/probe)
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Default budget for write calls (create/modify/delete)
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Transient; try again after backoff
    Retryable,
    /// Terminal; return immediately
    Fatal,
}

/// Custom classification function
pub type Classifier = Arc<dyn Fn(&Error) -> Classification + Send + Sync>;

/// Time budget plus classification for one call site
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total time allowed across all attempts
    pub max_elapsed: Duration,
    /// Delay schedule between attempts
    pub backoff: Backoff,
    /// Extra vendor codes treated as transient at this call site
    retry_codes: Vec<String>,
    /// Replaces the default classification when set
    classifier: Option<Classifier>,
}

impl RetryPolicy {
    /// Create a policy with the default classification
    pub fn new(max_elapsed: Duration) -> Self {
        Self {
            max_elapsed,
            backoff: Backoff::default(),
            retry_codes: Vec::new(),
            classifier: None,
        }
    }

    /// Policy for read calls with the default read budget
    pub fn read() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }

    /// Policy for write calls with the default write budget
    pub fn write() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT)
    }

    /// Set the backoff schedule
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the time budget
    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Treat additional vendor codes as transient
    #[must_use]
    pub fn retry_codes<S: Into<String>>(mut self, codes: impl IntoIterator<Item = S>) -> Self {
        self.retry_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Replace the default classification entirely
    #[must_use]
    pub fn classify_with<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Error) -> Classification + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Classify a failed attempt
    pub fn classify(&self, err: &Error) -> Classification {
        if let Some(classifier) = &self.classifier {
            return classifier(err);
        }

        if err.is_retryable() {
            return Classification::Retryable;
        }

        match err.remote_code() {
            Some(code) if self.retry_codes.iter().any(|c| code_matches(code, c)) => {
                Classification::Retryable
            }
            _ => Classification::Fatal,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::read()
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_elapsed", &self.max_elapsed)
            .field("backoff", &self.backoff)
            .field("retry_codes", &self.retry_codes)
            .field("has_classifier", &self.classifier.is_some())
            .finish()
    }
}
