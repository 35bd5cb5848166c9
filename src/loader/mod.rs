//! YAML Loader module
//!
//! Parse resource definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `ResourceDefinition` - Declarative resource type
//! - `IdentityPart` - Where each identity component comes from
//! - `WaitDefinition` - States of a long-running operation
//! - YAML parsing with validation
//!
//! # Example
//!
//! ```yaml
//! name: cvm_instance
//! identity:
//!   - field: region
//!   - field: instance_id
//!     source: assigned
//! fields:
//!   - name: region
//!     remote: Region
//!     immutable: true
//!   - name: instance_id
//!     remote: InstanceId
//!   - name: instance_name
//!     remote: InstanceName
//! actions:
//!   create: RunInstances
//!   describe: DescribeInstances
//!   update: ModifyInstancesAttribute
//!   delete: TerminateInstances
//! waits:
//!   create:
//!     pending: [PENDING]
//!     target: [RUNNING]
//!     failure: [LAUNCH_FAILED]
//! ```

mod parser;
mod types;

pub use parser::{load_definition, load_definition_from_str, validate_definition};
pub use types::{
    ActionsDefinition, IdentityPart, IdentitySource, ResourceDefinition, WaitDefinition,
    WaitsDefinition,
};

#[cfg(test)]
mod tests;
