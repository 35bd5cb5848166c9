//! Common types used throughout Solidafy Reconcile
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Lifecycle Operation
// ============================================================================

/// Lifecycle operation performed by the reconciliation driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Provision a new remote object
    Create,
    /// Refresh the canonical record from the remote object
    Read,
    /// Change mutable fields of an existing object
    Update,
    /// Remove the remote object
    Delete,
    /// Adopt an existing remote object by its identity string
    Import,
}

impl Operation {
    /// Whether this operation mutates remote state
    pub fn is_write(self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Delete)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::Import => write!(f, "import"),
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert_eq!(Operation::Import.to_string(), "import");
    }

    #[test]
    fn test_operation_is_write() {
        assert!(Operation::Create.is_write());
        assert!(Operation::Delete.is_write());
        assert!(!Operation::Read.is_write());
        assert!(!Operation::Import.is_write());
    }

    #[test]
    fn test_backoff_type_serde() {
        let parsed: BackoffType = serde_yaml::from_str("linear").unwrap();
        assert_eq!(parsed, BackoffType::Linear);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }
}
