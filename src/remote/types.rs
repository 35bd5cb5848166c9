//! Request and response types exchanged with the remote control plane

use crate::identity::ResourceIdentity;
use crate::types::{JsonObject, JsonValue, Operation};
use serde::{Deserialize, Serialize};

/// Opaque reference to a long-running remote operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One mutating call against the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    /// Resource type name
    pub resource: String,

    /// Remote action name (e.g., "RunInstances")
    pub action: String,

    /// Lifecycle step issuing the call
    pub operation: Operation,

    /// Target object; `None` for create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResourceIdentity>,

    /// Identity parameters addressing the target, keyed by remote name
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub selector: JsonObject,

    /// Request parameters, keyed by remote name
    #[serde(default)]
    pub payload: JsonObject,
}

impl RemoteRequest {
    /// Create a request with no target and an empty payload
    pub fn new(
        resource: impl Into<String>,
        action: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            operation,
            identity: None,
            selector: JsonObject::new(),
            payload: JsonObject::new(),
        }
    }

    /// Address an existing object
    #[must_use]
    pub fn with_target(mut self, identity: ResourceIdentity, selector: JsonObject) -> Self {
        self.identity = Some(identity);
        self.selector = selector;
        self
    }

    /// Set the request parameters
    #[must_use]
    pub fn with_payload(mut self, payload: JsonObject) -> Self {
        self.payload = payload;
        self
    }
}

/// Result of an accepted submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Present when the remote finishes the work asynchronously
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<OperationHandle>,

    /// Response fields, such as server-assigned ids
    #[serde(default)]
    pub outputs: JsonObject,
}

impl Submission {
    /// A submission that completed synchronously with no outputs
    pub fn done() -> Self {
        Self::default()
    }

    /// A submission still running remotely
    pub fn pending(handle: OperationHandle) -> Self {
        Self {
            handle: Some(handle),
            outputs: JsonObject::new(),
        }
    }

    /// Attach response fields
    #[must_use]
    pub fn with_outputs(mut self, outputs: JsonObject) -> Self {
        self.outputs = outputs;
        self
    }

    /// Output value rendered as an identity component
    pub fn output_str(&self, key: &str) -> Option<String> {
        match self.outputs.get(key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            // batch create APIs return a one-element id list
            JsonValue::Array(items) if items.len() == 1 => match &items[0] {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}
