//! What a waiter polls for

use crate::error::{Error, Result};
use crate::retry::DEFAULT_READ_TIMEOUT;
use std::collections::BTreeSet;
use std::time::Duration;

/// Default delay between status probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Meta-state of a waiter after observing a remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Keep polling
    Pending,
    /// Reached a target state
    Converged,
    /// Reached a failure state
    Diverged,
}

/// What to wait for and how long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiterSpec {
    /// States that mean "still working"
    pub pending: BTreeSet<String>,
    /// States that mean success
    pub target: BTreeSet<String>,
    /// States that mean the remote operation failed
    pub failure: BTreeSet<String>,
    /// Total time to wait
    pub timeout: Duration,
    /// Delay between probes
    pub poll_interval: Duration,
    /// Delay before the first probe
    pub initial_delay: Duration,
}

impl WaiterSpec {
    /// Wait for any of `target`, with default timing
    pub fn new<S: Into<String>>(target: impl IntoIterator<Item = S>) -> Self {
        Self {
            pending: BTreeSet::new(),
            target: target.into_iter().map(Into::into).collect(),
            failure: BTreeSet::new(),
            timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_delay: Duration::ZERO,
        }
    }

    /// Set the pending states
    #[must_use]
    pub fn pending<S: Into<String>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.pending = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the failure states
    #[must_use]
    pub fn failure<S: Into<String>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.failure = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the delay before the first probe
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Check the state sets: target non-empty, all three pairwise disjoint
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(Error::config("waiter needs at least one target state"));
        }

        let pairs = [
            ("pending", &self.pending, "target", &self.target),
            ("pending", &self.pending, "failure", &self.failure),
            ("target", &self.target, "failure", &self.failure),
        ];
        for (left_name, left, right_name, right) in pairs {
            if let Some(state) = left.intersection(right).next() {
                return Err(Error::config(format!(
                    "state '{state}' is listed as both {left_name} and {right_name}"
                )));
            }
        }

        Ok(())
    }

    /// Map a remote state to a meta-state; unrecognized states stay pending
    pub fn phase(&self, state: &str) -> Phase {
        if self.failure.contains(state) {
            Phase::Diverged
        } else if self.target.contains(state) {
            Phase::Converged
        } else {
            Phase::Pending
        }
    }

    /// Whether `state` appears in any of the three sets
    pub fn is_known(&self, state: &str) -> bool {
        self.pending.contains(state) || self.target.contains(state) || self.failure.contains(state)
    }
}
