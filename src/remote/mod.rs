//! Remote API capability
//!
//! The reconciliation driver talks to the vendor control plane only through
//! [`RemoteApi`]. Transport, credentials, and request signing live behind
//! the implementation.
//!
//! # Overview
//!
//! The remote module provides:
//! - `RemoteApi` - submit, probe, and fetch
//! - `RemoteRequest` / `Submission` / `OperationHandle` - call payloads
//! - `InMemoryRemote` - scriptable in-process backend for tests

mod memory;
mod types;

pub use memory::InMemoryRemote;
pub use types::{OperationHandle, RemoteRequest, Submission};

use crate::error::Result;
use crate::identity::ResourceIdentity;
use crate::loader::ResourceDefinition;
use crate::projection::RemoteAttributeSet;

/// Blocking access to a remote control plane
pub trait RemoteApi {
    /// Issue a mutating call
    fn submit(&self, request: &RemoteRequest) -> Result<Submission>;

    /// Report the current state of a long-running operation
    fn probe(&self, handle: &OperationHandle) -> Result<String>;

    /// Describe one object; `Ok(None)` when it does not exist.
    ///
    /// A vendor `ResourceNotFound` error is also treated as absence by the
    /// driver.
    fn fetch(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
    ) -> Result<Option<RemoteAttributeSet>>;
}

impl<T: RemoteApi + ?Sized> RemoteApi for &T {
    fn submit(&self, request: &RemoteRequest) -> Result<Submission> {
        (**self).submit(request)
    }

    fn probe(&self, handle: &OperationHandle) -> Result<String> {
        (**self).probe(handle)
    }

    fn fetch(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
    ) -> Result<Option<RemoteAttributeSet>> {
        (**self).fetch(definition, identity)
    }
}

impl<T: RemoteApi + ?Sized> RemoteApi for std::sync::Arc<T> {
    fn submit(&self, request: &RemoteRequest) -> Result<Submission> {
        (**self).submit(request)
    }

    fn probe(&self, handle: &OperationHandle) -> Result<String> {
        (**self).probe(handle)
    }

    fn fetch(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
    ) -> Result<Option<RemoteAttributeSet>> {
        (**self).fetch(definition, identity)
    }
}
