//! Reconciliation driver module
//!
//! Runs one lifecycle step (create, read, update, delete, import) against a
//! remote object, composing identity encoding, retries, convergence waits,
//! and state projection.
//!
//! # Overview
//!
//! ```text
//! LifecycleRequest ──► ReconciliationDriver ──► Report
//!                          │
//!          ┌───────────────┼────────────────┐
//!          ▼               ▼                ▼
//!   RetryExecutor   ConvergenceWaiter  StateProjector
//!          │               │
//!          └──────► RemoteApi ◄─────┘
//! ```
//!
//! A missing object is an [`Outcome`], not an error. No step rolls back
//! partial remote effects.

mod reconciler;
mod types;

pub use reconciler::ReconciliationDriver;
pub use types::{LifecycleRequest, Outcome, ReconciliationAttempt, Report};
