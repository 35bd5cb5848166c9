//! Error types for Solidafy Reconcile
//!
//! This module defines the error hierarchy for the whole reconciliation layer.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! There is no `NotFound` variant: a missing remote object is reported as
//! [`Outcome::NotFound`](crate::driver::Outcome), not as an error.

use crate::types::Operation;
use std::time::Duration;
use thiserror::Error;

/// Vendor error codes that indicate a transient failure.
///
/// A remote code matches when it equals an entry or extends it with a
/// `.`-separated sub-code (`InternalError.DbError` matches `InternalError`).
pub const DEFAULT_RETRYABLE_CODES: &[&str] = &[
    "ClientError.NetworkError",
    "ClientError.HttpStatusCodeError",
    "InternalError",
    "RequestLimitExceeded",
    "ResourceUnavailable",
    "ResourceBusy",
    "FailedOperation.ResourceInOperating",
];

/// Code prefix the vendor uses for every "object does not exist" error
pub const NOT_FOUND_CODE: &str = "ResourceNotFound";

/// The main error type for Solidafy Reconcile
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Identity Errors
    // ============================================================================
    #[error("Invalid identity component at position {index} ('{component}'): {reason}")]
    InvalidComponent {
        index: usize,
        component: String,
        reason: String,
    },

    #[error("Malformed identity '{id}': expected {expected} components, found {found}")]
    MalformedIdentity {
        id: String,
        expected: usize,
        found: usize,
    },

    // ============================================================================
    // Remote Errors
    // ============================================================================
    #[error("Remote call failed: {0}")]
    Remote(RemoteError),

    #[error("Retry budget of {budget_ms}ms exhausted after {attempts} attempts: {last}")]
    RetryBudgetExhausted {
        attempts: u32,
        elapsed_ms: u64,
        budget_ms: u64,
        #[source]
        last: Box<Error>,
    },

    #[error(transparent)]
    Wait(#[from] WaiterError),

    // ============================================================================
    // Lifecycle Errors
    // ============================================================================
    #[error("Argument `{field}` cannot be changed")]
    ImmutableFieldChanged { field: String },

    #[error("Resource '{id}' does not exist")]
    ResourceNotFound { id: String },

    #[error("Resource '{id}' is not visible after {operation}")]
    ResourceVanished { id: String, operation: Operation },

    #[error("Invalid lifecycle request: {message}")]
    InvalidRequest { message: String },

    // ============================================================================
    // Projection Errors
    // ============================================================================
    #[error("Field '{field}' expected {expected}, remote returned {found}")]
    ShapeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        Self::Remote(err)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a remote error from a vendor code and message
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote(RemoteError::new(code, message))
    }

    /// Check if this error is retryable under the default classification.
    ///
    /// Only remote failures can be transient; local contract violations and
    /// already-wrapped terminal errors never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if this error reports that the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Remote(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// The vendor error code, if this is a remote failure
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Error::Remote(e) => Some(e.code.as_str()),
            _ => None,
        }
    }

    /// Innermost error, looking through a retry budget wrapper
    pub fn last_cause(&self) -> &Error {
        match self {
            Error::RetryBudgetExhausted { last, .. } => last.last_cause(),
            other => other,
        }
    }

    pub(crate) fn budget_exhausted(
        attempts: u32,
        elapsed: Duration,
        budget: Duration,
        last: Error,
    ) -> Self {
        Self::RetryBudgetExhausted {
            attempts,
            elapsed_ms: elapsed.as_millis() as u64,
            budget_ms: budget.as_millis() as u64,
            last: Box::new(last),
        }
    }
}

/// A failure reported by the remote control plane
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{code}] {message}{}", request_suffix(.request_id))]
pub struct RemoteError {
    /// Vendor error code, e.g. `InternalError` or `ResourceNotFound.Instance`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Request id echoed by the vendor, if any
    pub request_id: Option<String>,
}

fn request_suffix(request_id: &Option<String>) -> String {
    match request_id {
        Some(id) => format!(" (request {id})"),
        None => String::new(),
    }
}

impl RemoteError {
    /// Create a remote error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Attach the vendor request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Whether the code matches `code` exactly or as a dotted prefix
    pub fn has_code(&self, code: &str) -> bool {
        code_matches(&self.code, code)
    }

    /// Check if this code is in [`DEFAULT_RETRYABLE_CODES`]
    pub fn is_retryable(&self) -> bool {
        DEFAULT_RETRYABLE_CODES.iter().any(|c| self.has_code(c))
    }

    /// Check if this error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        self.has_code(NOT_FOUND_CODE)
    }
}

/// `InternalError.DbError` matches `InternalError`, `InternalErrorX` does not
pub(crate) fn code_matches(code: &str, pattern: &str) -> bool {
    code == pattern
        || (code.len() > pattern.len()
            && code.starts_with(pattern)
            && code.as_bytes()[pattern.len()] == b'.')
}

/// Terminal failures of a [`ConvergenceWaiter`](crate::waiter::ConvergenceWaiter)
#[derive(Error, Debug)]
pub enum WaiterError {
    #[error(
        "Timed out after {timeout_ms}ms waiting for {target:?} (last state: {})",
        .last_state.as_deref().unwrap_or("none")
    )]
    Timeout {
        timeout_ms: u64,
        target: Vec<String>,
        last_state: Option<String>,
    },

    #[error("Remote operation entered failure state '{state}'")]
    FailureState { state: String },

    #[error("Status probe failed: {0}")]
    Probe(#[source] Box<Error>),
}

/// Result type alias for Solidafy Reconcile
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
