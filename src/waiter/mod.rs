//! Convergence waiter module
//!
//! Polls a status probe until a long-running remote operation reaches a
//! target state, a failure state, or the timeout elapses.
//!
//! # Overview
//!
//! The waiter module provides:
//! - `WaiterSpec` - pending/target/failure state sets plus timing
//! - `ConvergenceWaiter` - the blocking poll loop
//! - `Phase` - the meta-state a probed state maps to

mod convergence;
mod spec;

pub use convergence::ConvergenceWaiter;
pub use spec::{Phase, WaiterSpec, DEFAULT_POLL_INTERVAL};

#[cfg(test)]
mod tests;
