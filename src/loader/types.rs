//! Resource definition types
//!
//! These types are deserialized from YAML resource definitions.

use crate::config::TimeoutOverrides;
use crate::identity::ResourceIdentity;
use crate::projection::RecordShape;
use crate::types::{JsonObject, JsonValue};
use crate::waiter::WaiterSpec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Resource Definition
// ============================================================================

/// Declarative description of one remote resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource type name (e.g., "cos_bucket")
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered identity components
    pub identity: Vec<IdentityPart>,

    /// Canonical record fields
    #[serde(default)]
    pub fields: RecordShape,

    /// Remote action names
    pub actions: ActionsDefinition,

    /// Long-running operation states, per lifecycle step
    #[serde(default)]
    pub waits: WaitsDefinition,

    /// After delete, poll describe until the object is gone
    #[serde(default)]
    pub wait_for_absence: bool,

    /// Time budgets for this resource type
    #[serde(default)]
    pub timeouts: TimeoutOverrides,
}

impl ResourceDefinition {
    /// Number of identity components
    pub fn arity(&self) -> usize {
        self.identity.len()
    }

    /// Remote field name that carries an identity part
    pub fn remote_key<'a>(&'a self, part: &'a IdentityPart) -> &'a str {
        self.fields
            .field(&part.field)
            .map(|f| f.remote_name())
            .unwrap_or(part.field.as_str())
    }

    /// Key in submission outputs that carries an assigned identity part
    pub fn output_key<'a>(&'a self, part: &'a IdentityPart) -> &'a str {
        part.output.as_deref().unwrap_or_else(|| self.remote_key(part))
    }

    /// Identity parameters addressing the remote object, keyed by remote name
    pub fn selector(&self, identity: &ResourceIdentity) -> JsonObject {
        self.identity
            .iter()
            .zip(identity.components())
            .map(|(part, component)| {
                (
                    self.remote_key(part).to_string(),
                    JsonValue::String(component.clone()),
                )
            })
            .collect()
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Where an identity component comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Taken from the desired record before create
    #[default]
    Local,
    /// Assigned by the remote and returned in the create outputs
    Assigned,
}

/// One component of a composite identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPart {
    /// Canonical field the component maps to
    pub field: String,

    /// Component source
    #[serde(default)]
    pub source: IdentitySource,

    /// Output key for assigned parts, if it differs from the remote field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl IdentityPart {
    /// Component taken from the desired record
    pub fn local(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            source: IdentitySource::Local,
            output: None,
        }
    }

    /// Component assigned by the remote
    pub fn assigned(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            source: IdentitySource::Assigned,
            output: None,
        }
    }

    /// Read the assigned value from a differently named output
    #[must_use]
    pub fn from_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn is_assigned(&self) -> bool {
        self.source == IdentitySource::Assigned
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Remote API action names for each lifecycle step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsDefinition {
    pub create: String,

    /// Read action, used for every fetch
    pub describe: String,

    /// Modify action; without one every mutable change is rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,

    pub delete: String,
}

// ============================================================================
// Waits
// ============================================================================

/// Wait states per lifecycle step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitsDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<WaitDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<WaitDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<WaitDefinition>,
}

/// States of a long-running remote operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitDefinition {
    /// States meaning the operation is still running
    #[serde(default)]
    pub pending: Vec<String>,

    /// States meaning success
    pub target: Vec<String>,

    /// States meaning the operation failed
    #[serde(default)]
    pub failure: Vec<String>,

    /// Poll interval override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Delay before the first probe in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    /// Declared field holding the object's state.
    ///
    /// When set, the wait describes the object and reads this field instead
    /// of probing an operation handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_field: Option<String>,
}

impl WaitDefinition {
    /// Build a waiter spec, using `poll_interval` unless overridden
    pub fn to_spec(&self, timeout: Duration, poll_interval: Duration) -> WaiterSpec {
        WaiterSpec::new(self.target.iter().cloned())
            .pending(self.pending.iter().cloned())
            .failure(self.failure.iter().cloned())
            .timeout(timeout)
            .poll_interval(
                self.poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(poll_interval),
            )
            .initial_delay(
                self.initial_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(Duration::ZERO),
            )
    }
}
