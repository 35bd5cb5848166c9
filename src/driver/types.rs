//! Lifecycle requests and their outcomes

use crate::projection::{CanonicalRecord, FieldChange};
use crate::types::Operation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One lifecycle step requested by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum LifecycleRequest {
    /// Provision a new object from the desired record
    Create { desired: CanonicalRecord },

    /// Refresh the record of an existing object
    Read { id: String },

    /// Apply the difference between `prior` and `desired`
    Update {
        id: String,
        prior: CanonicalRecord,
        desired: CanonicalRecord,
    },

    /// Remove an object
    Delete { id: String },

    /// Adopt an existing object by id
    Import { id: String },
}

impl LifecycleRequest {
    pub fn create(desired: CanonicalRecord) -> Self {
        Self::Create { desired }
    }

    pub fn read(id: impl Into<String>) -> Self {
        Self::Read { id: id.into() }
    }

    pub fn update(id: impl Into<String>, prior: CanonicalRecord, desired: CanonicalRecord) -> Self {
        Self::Update {
            id: id.into(),
            prior,
            desired,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete { id: id.into() }
    }

    pub fn import(id: impl Into<String>) -> Self {
        Self::Import { id: id.into() }
    }

    /// Lifecycle operation performed
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::Read { .. } => Operation::Read,
            Self::Update { .. } => Operation::Update,
            Self::Delete { .. } => Operation::Delete,
            Self::Import { .. } => Operation::Import,
        }
    }

    /// Identity string the request targets; `None` for create
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Create { .. } => None,
            Self::Read { id }
            | Self::Update { id, .. }
            | Self::Delete { id }
            | Self::Import { id } => Some(id),
        }
    }
}

/// Terminal result of a lifecycle step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The object exists; `record` is its canonical state
    Present { id: String, record: CanonicalRecord },
    /// The object does not exist; the host should drop it from state
    NotFound,
    /// The object was removed, or was already gone
    Deleted,
}

impl Outcome {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Identity string of a present object
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Present { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Canonical record of a present object
    pub fn record(&self) -> Option<&CanonicalRecord> {
        match self {
            Self::Present { record, .. } => Some(record),
            _ => None,
        }
    }
}

/// Record of one driver invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationAttempt {
    /// Identity string; `None` only for a create that failed before one existed
    pub identity: Option<String>,
    pub operation: Operation,
    pub started_at: DateTime<Utc>,
    pub outcome: Outcome,
}

/// What the driver returns for a successful lifecycle step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub attempt: ReconciliationAttempt,

    /// Wall time spent, retries and waits included
    pub elapsed_ms: u64,

    /// Fields that differ from the prior record (update only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drift: Vec<FieldChange>,
}

impl Report {
    pub fn outcome(&self) -> &Outcome {
        &self.attempt.outcome
    }

    /// Canonical record, if the object exists
    pub fn record(&self) -> Option<&CanonicalRecord> {
        self.attempt.outcome.record()
    }

    /// Identity string, if known
    pub fn id(&self) -> Option<&str> {
        self.attempt.identity.as_deref()
    }
}
