// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]

//! # Solidafy Reconcile
//!
//! Reconciliation core for adapters that expose a cloud vendor's
//! control-plane API as declarative infrastructure resources.
//!
//! ## Features
//!
//! - **Composite Identity**: Multi-field ids encoded into one opaque string
//! - **Bounded Retries**: Transient/fatal classification under a time budget
//! - **Convergence Waits**: Poll long-running operations to a target state
//! - **State Projection**: Sparse remote snapshots into canonical records
//! - **Lifecycle Driver**: Create, read, update, delete, and import
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_reconcile::{load_definition, ReconciliationDriver, Result};
//!
//! fn main() -> Result<()> {
//!     let definition = load_definition("resources/cvm_instance.yaml")?;
//!     let driver = ReconciliationDriver::new(MyVendorClient::new());
//!
//!     let report = driver.read(&definition, "ap-guangzhou#ins-1")?;
//!     if let Some(record) = report.record() {
//!         println!("{}", record.to_json_string());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ReconciliationDriver                        │
//! │  create()  read()  update()  delete()  import()  → Report       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────┬────────────────┼───────────────┬──────────────────┐
//! │  Identity   │     Retry      │    Waiter     │   Projection     │
//! ├─────────────┼────────────────┼───────────────┼──────────────────┤
//! │ Encode      │ Classify       │ Pending       │ Present          │
//! │ Decode      │ Time budget    │ Target        │ Explicit null    │
//! │ Arity check │ Backoff        │ Failure       │ Absent           │
//! │             │ Rate limit     │ Timeout       │ Drift            │
//! └─────────────┴────────────────┴───────────────┴──────────────────┘
//!                                │
//!                    RemoteApi: submit / probe / fetch
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Composite resource identities
pub mod identity;

/// Bounded-time retries with rate limiting
pub mod retry;

/// Polling long-running operations
pub mod waiter;

/// Remote snapshot projection
pub mod projection;

/// Remote API capability
pub mod remote;

/// Runtime configuration
pub mod config;

/// YAML loader for resource definitions
pub mod loader;

/// Lifecycle orchestration
pub mod driver;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ReconcileConfig;
pub use driver::{LifecycleRequest, Outcome, ReconciliationDriver, Report};
pub use identity::{IdentityCodec, ResourceIdentity};
pub use loader::{load_definition, load_definition_from_str, ResourceDefinition};
pub use projection::{CanonicalRecord, RemoteAttributeSet};
pub use remote::{InMemoryRemote, RemoteApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
