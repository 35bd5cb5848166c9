//! In-memory remote backend for testing.
//!
//! Holds remote objects in process and serves scripted operation states,
//! outputs, and failures, making driver behaviour deterministic in tests.

use super::types::{OperationHandle, RemoteRequest, Submission};
use super::RemoteApi;
use crate::error::{Error, RemoteError, Result, NOT_FOUND_CODE};
use crate::identity::ResourceIdentity;
use crate::loader::ResourceDefinition;
use crate::projection::RemoteAttributeSet;
use crate::types::{JsonObject, JsonValue, Operation};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct StoredObject {
    attrs: JsonObject,
    /// Fetches that still miss a freshly created object
    invisible_for: usize,
    /// Set once deleted; fetches that still see it
    lingering_for: Option<usize>,
}

impl StoredObject {
    fn matches(&self, selector: &JsonObject) -> bool {
        selector
            .iter()
            .all(|(key, wanted)| match (self.attrs.get(key), wanted.as_str()) {
                (Some(JsonValue::String(s)), Some(w)) => s == w,
                (Some(JsonValue::Number(n)), Some(w)) => n.to_string() == w,
                (Some(value), _) => value == wanted,
                (None, _) => false,
            })
    }

    fn is_deleted(&self) -> bool {
        self.lingering_for.is_some()
    }
}

#[derive(Debug, Default)]
struct State {
    objects: Vec<StoredObject>,
    outputs: HashMap<String, JsonObject>,
    scripts: HashMap<String, Vec<String>>,
    handles: HashMap<String, (Vec<String>, usize)>,
    field_scripts: HashMap<String, (Vec<JsonValue>, usize)>,
    failures: HashMap<String, VecDeque<RemoteError>>,
    probe_failures: VecDeque<RemoteError>,
    hidden: HashSet<String>,
    create_lag: usize,
    delete_lag: usize,
    requests: Vec<RemoteRequest>,
    calls: HashMap<String, usize>,
    probes: usize,
    next_handle: u64,
}

impl State {
    fn take_failure(&mut self, action: &str) -> Option<RemoteError> {
        self.failures.get_mut(action).and_then(VecDeque::pop_front)
    }

    fn find_live(&self, selector: &JsonObject) -> Option<usize> {
        self.objects
            .iter()
            .position(|o| !o.is_deleted() && o.matches(selector))
    }
}

/// A test double that keeps remote objects in memory
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: Mutex<State>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an object that already exists remotely
    pub fn insert(&self, snapshot: RemoteAttributeSet) {
        self.state().objects.push(StoredObject {
            attrs: snapshot.as_object().clone(),
            invisible_for: 0,
            lingering_for: None,
        });
    }

    /// Response fields returned by every submission of `action`
    pub fn set_outputs(&self, action: &str, outputs: JsonObject) {
        self.state().outputs.insert(action.to_string(), outputs);
    }

    /// Make `action` asynchronous: its handle reports `states` in order,
    /// repeating the last one
    pub fn script_states<S: Into<String>>(
        &self,
        action: &str,
        states: impl IntoIterator<Item = S>,
    ) {
        let states: Vec<String> = states.into_iter().map(Into::into).collect();
        self.state().scripts.insert(action.to_string(), states);
    }

    /// Describe responses report `field` as `values` in order, repeating the
    /// last one
    pub fn script_field<V: Into<JsonValue>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) {
        let values: Vec<JsonValue> = values.into_iter().map(Into::into).collect();
        self.state().field_scripts.insert(field.to_string(), (values, 0));
    }

    /// Fail the next call of `action` (a submit or describe action)
    pub fn fail_next(&self, action: &str, error: RemoteError) {
        self.fail_times(action, 1, error);
    }

    /// Fail the next `times` calls of `action`
    pub fn fail_times(&self, action: &str, times: usize, error: RemoteError) {
        let mut state = self.state();
        let queue = state.failures.entry(action.to_string()).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Fail the next status probe
    pub fn fail_next_probe(&self, error: RemoteError) {
        self.state().probe_failures.push_back(error);
    }

    /// Newly created objects stay invisible for `fetches` describe calls
    pub fn set_create_lag(&self, fetches: usize) {
        self.state().create_lag = fetches;
    }

    /// Deleted objects stay visible for `fetches` describe calls
    pub fn set_delete_lag(&self, fetches: usize) {
        self.state().delete_lag = fetches;
    }

    /// Strip a remote field from every describe response
    pub fn hide_field(&self, name: &str) {
        self.state().hidden.insert(name.to_string());
    }

    /// Every submitted request, in order
    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.state().requests.clone()
    }

    /// Number of calls made for `action`, failed ones included
    pub fn calls(&self, action: &str) -> usize {
        self.state().calls.get(action).copied().unwrap_or(0)
    }

    /// Number of status probes
    pub fn probes(&self) -> usize {
        self.state().probes
    }

    /// Objects that have not been deleted
    pub fn objects(&self) -> Vec<RemoteAttributeSet> {
        self.state()
            .objects
            .iter()
            .filter(|o| !o.is_deleted())
            .map(|o| RemoteAttributeSet::from_object(o.attrs.clone()))
            .collect()
    }
}

fn not_found(selector: &JsonObject) -> Error {
    Error::remote(
        NOT_FOUND_CODE,
        format!("no object matches {}", JsonValue::Object(selector.clone())),
    )
}

impl RemoteApi for InMemoryRemote {
    fn submit(&self, request: &RemoteRequest) -> Result<Submission> {
        let mut state = self.state();
        state.requests.push(request.clone());
        *state.calls.entry(request.action.clone()).or_default() += 1;

        if !request.operation.is_write() {
            return Err(Error::invalid_request(format!(
                "{} is not a mutating operation",
                request.operation
            )));
        }
        if let Some(err) = state.take_failure(&request.action) {
            return Err(err.into());
        }

        let outputs = state.outputs.get(&request.action).cloned().unwrap_or_default();

        match request.operation {
            Operation::Create => {
                let mut attrs = request.payload.clone();
                attrs.extend(outputs.clone());
                let invisible_for = state.create_lag;
                state.objects.push(StoredObject {
                    attrs,
                    invisible_for,
                    lingering_for: None,
                });
            }
            Operation::Update => {
                let index = state
                    .find_live(&request.selector)
                    .ok_or_else(|| not_found(&request.selector))?;
                state.objects[index].attrs.extend(request.payload.clone());
            }
            Operation::Delete => {
                let index = state
                    .find_live(&request.selector)
                    .ok_or_else(|| not_found(&request.selector))?;
                if state.delete_lag == 0 {
                    state.objects.remove(index);
                } else {
                    let lag = state.delete_lag;
                    state.objects[index].lingering_for = Some(lag);
                }
            }
            Operation::Read | Operation::Import => {}
        }

        let submission = match state.scripts.get(&request.action).cloned() {
            Some(states) if !states.is_empty() => {
                state.next_handle += 1;
                let handle = format!("{}-{}", request.action, state.next_handle);
                state.handles.insert(handle.clone(), (states, 0));
                Submission::pending(OperationHandle::new(handle))
            }
            _ => Submission::done(),
        };

        Ok(submission.with_outputs(outputs))
    }

    fn probe(&self, handle: &OperationHandle) -> Result<String> {
        let mut state = self.state();
        state.probes += 1;

        if let Some(err) = state.probe_failures.pop_front() {
            return Err(err.into());
        }

        let (states, position) = state.handles.get_mut(handle.as_str()).ok_or_else(|| {
            Error::remote("InvalidParameter", format!("unknown operation '{handle}'"))
        })?;
        let current = states[(*position).min(states.len() - 1)].clone();
        *position += 1;
        Ok(current)
    }

    fn fetch(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
    ) -> Result<Option<RemoteAttributeSet>> {
        let action = &definition.actions.describe;
        let mut guard = self.state();
        let state = &mut *guard;
        *state.calls.entry(action.clone()).or_default() += 1;

        if let Some(err) = state.take_failure(action) {
            return Err(err.into());
        }

        let selector = definition.selector(identity);
        let Some(index) = state.objects.iter().position(|o| o.matches(&selector)) else {
            return Ok(None);
        };

        let object = &mut state.objects[index];
        let lingering = object.lingering_for;
        match lingering {
            Some(0) => {
                state.objects.remove(index);
                return Ok(None);
            }
            Some(remaining) => object.lingering_for = Some(remaining - 1),
            None if object.invisible_for > 0 => {
                object.invisible_for -= 1;
                return Ok(None);
            }
            None => {}
        }

        let mut attrs = state.objects[index].attrs.clone();
        for (field, (values, position)) in &mut state.field_scripts {
            if let Some(value) = values.get((*position).min(values.len().saturating_sub(1))) {
                attrs.insert(field.clone(), value.clone());
                *position += 1;
            }
        }
        for field in &state.hidden {
            attrs.remove(field);
        }
        Ok(Some(RemoteAttributeSet::from_object(attrs)))
    }
}
