//! Blocking poll loop

use super::spec::{Phase, WaiterSpec};
use crate::error::{Result, WaiterError};
use crate::retry::Backoff;
use std::time::Instant;
use tracing::{debug, warn};

/// Polls a probe until the observed state converges or diverges
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvergenceWaiter;

impl ConvergenceWaiter {
    /// Create a waiter
    pub fn new() -> Self {
        Self
    }

    /// Block until `probe` reports a target state.
    ///
    /// Returns the target state reached. A probe error, a failure state, or
    /// the timeout elapsing while pending ends the wait with a
    /// [`WaiterError`].
    pub fn wait<F>(&self, spec: &WaiterSpec, mut probe: F) -> Result<String>
    where
        F: FnMut() -> Result<String>,
    {
        spec.validate()?;

        let started = Instant::now();
        if !spec.initial_delay.is_zero() {
            std::thread::sleep(std::cmp::min(spec.initial_delay, spec.timeout));
        }

        let backoff = Backoff::constant(spec.poll_interval);
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            let state = probe().map_err(|e| WaiterError::Probe(Box::new(e)))?;

            match spec.phase(&state) {
                Phase::Diverged => {
                    warn!("Remote operation failed with state '{}' after {} polls", state, polls);
                    return Err(WaiterError::FailureState { state }.into());
                }
                Phase::Converged => {
                    debug!(
                        "Converged to '{}' after {} polls in {:?}",
                        state,
                        polls,
                        started.elapsed()
                    );
                    return Ok(state);
                }
                Phase::Pending => {}
            }

            if !spec.is_known(&state) {
                warn!("Unexpected state '{}' while waiting, treating as pending", state);
            }

            let elapsed = started.elapsed();
            if elapsed >= spec.timeout {
                return Err(WaiterError::Timeout {
                    timeout_ms: spec.timeout.as_millis() as u64,
                    target: spec.target.iter().cloned().collect(),
                    last_state: Some(state),
                }
                .into());
            }

            let delay = std::cmp::min(backoff.delay(polls - 1), spec.timeout - elapsed);
            debug!("State '{}' pending, next poll in {:?}", state, delay);
            std::thread::sleep(delay);
        }
    }
}
