//! Tests for the convergence waiter

use super::*;
use crate::error::{Error, WaiterError};
use std::cell::Cell;
use std::time::{Duration, Instant};

struct Script {
    states: &'static [&'static str],
    calls: Cell<usize>,
}

impl Script {
    fn new(states: &'static [&'static str]) -> Self {
        Self {
            states,
            calls: Cell::new(0),
        }
    }

    /// Returns the scripted states in order, repeating the last one
    fn probe(&self) -> crate::Result<String> {
        let index = self.calls.get().min(self.states.len() - 1);
        self.calls.set(self.calls.get() + 1);
        Ok(self.states[index].to_string())
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }
}

fn quick(spec: WaiterSpec) -> WaiterSpec {
    spec.poll_interval(Duration::from_millis(2))
        .timeout(Duration::from_secs(2))
}

// ============================================================================
// WaiterSpec Tests
// ============================================================================

#[test]
fn test_spec_defaults() {
    let spec = WaiterSpec::new(["active"]);
    assert_eq!(spec.poll_interval, DEFAULT_POLL_INTERVAL);
    assert_eq!(spec.initial_delay, Duration::ZERO);
    assert!(spec.validate().is_ok());
}

#[test]
fn test_spec_rejects_overlap() {
    let spec = WaiterSpec::new(["active"]).pending(["creating", "active"]);
    let err = spec.validate().unwrap_err();
    assert!(err.to_string().contains("both pending and target"));

    let spec = WaiterSpec::new(["active"]).failure(["active"]);
    assert!(spec.validate().is_err());
}

#[test]
fn test_spec_rejects_empty_target() {
    let empty: [&str; 0] = [];
    assert!(WaiterSpec::new(empty).validate().is_err());
}

#[test]
fn test_spec_phase() {
    let spec = WaiterSpec::new(["active"])
        .pending(["creating"])
        .failure(["failed"]);
    assert_eq!(spec.phase("creating"), Phase::Pending);
    assert_eq!(spec.phase("active"), Phase::Converged);
    assert_eq!(spec.phase("failed"), Phase::Diverged);
    assert_eq!(spec.phase("rebooting"), Phase::Pending);
    assert!(!spec.is_known("rebooting"));
}

// ============================================================================
// Waiter Tests
// ============================================================================

#[test]
fn test_wait_converges_after_three_polls() {
    let script = Script::new(&["InProgress", "InProgress", "Done"]);
    let spec = quick(WaiterSpec::new(["Done"]).pending(["InProgress"]));

    let state = ConvergenceWaiter::new().wait(&spec, || script.probe()).unwrap();

    assert_eq!(state, "Done");
    assert_eq!(script.calls(), 3);
}

#[test]
fn test_wait_immediate_target() {
    let script = Script::new(&["running"]);
    let spec = quick(WaiterSpec::new(["running"]));
    assert_eq!(ConvergenceWaiter::new().wait(&spec, || script.probe()).unwrap(), "running");
    assert_eq!(script.calls(), 1);
}

#[test]
fn test_wait_failure_state() {
    let script = Script::new(&["1", "1", "3"]);
    let spec = quick(WaiterSpec::new(["2"]).pending(["1"]).failure(["3"]));

    let err = ConvergenceWaiter::new()
        .wait(&spec, || script.probe())
        .unwrap_err();

    match err {
        Error::Wait(WaiterError::FailureState { state }) => assert_eq!(state, "3"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(script.calls(), 3);
}

#[test]
fn test_wait_probe_error() {
    let calls = Cell::new(0);
    let spec = quick(WaiterSpec::new(["ok"]).pending(["working"]));

    let err = ConvergenceWaiter::new()
        .wait(&spec, || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Ok("working".to_string())
            } else {
                Err(Error::remote("AuthFailure", "expired"))
            }
        })
        .unwrap_err();

    match err {
        Error::Wait(WaiterError::Probe(inner)) => {
            assert_eq!(inner.remote_code(), Some("AuthFailure"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_wait_timeout() {
    let script = Script::new(&["PROCESSING"]);
    let timeout = Duration::from_millis(50);
    let spec = WaiterSpec::new(["FINISH"])
        .pending(["PROCESSING"])
        .poll_interval(Duration::from_millis(10))
        .timeout(timeout);

    let started = Instant::now();
    let err = ConvergenceWaiter::new()
        .wait(&spec, || script.probe())
        .unwrap_err();

    match err {
        Error::Wait(WaiterError::Timeout {
            timeout_ms,
            last_state,
            target,
        }) => {
            assert_eq!(timeout_ms, 50);
            assert_eq!(last_state.as_deref(), Some("PROCESSING"));
            assert_eq!(target, vec!["FINISH".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(script.calls() >= 2);
    assert!(started.elapsed() < timeout + Duration::from_millis(40));
}

#[test]
fn test_wait_unrecognized_state_stays_pending() {
    let script = Script::new(&["weird", "active"]);
    let spec = quick(WaiterSpec::new(["active"]).pending(["creating"]));
    assert_eq!(ConvergenceWaiter::new().wait(&spec, || script.probe()).unwrap(), "active");
    assert_eq!(script.calls(), 2);
}

#[test]
fn test_wait_initial_delay() {
    let script = Script::new(&["ready"]);
    let spec = quick(WaiterSpec::new(["ready"])).initial_delay(Duration::from_millis(20));

    let started = Instant::now();
    ConvergenceWaiter::new().wait(&spec, || script.probe()).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_wait_invalid_spec_never_probes() {
    let calls = Cell::new(0);
    let spec = WaiterSpec::new(["a"]).failure(["a"]);
    let result = ConvergenceWaiter::new().wait(&spec, || {
        calls.set(calls.get() + 1);
        Ok("a".to_string())
    });
    assert!(matches!(result, Err(Error::Config { .. })));
    assert_eq!(calls.get(), 0);
}
