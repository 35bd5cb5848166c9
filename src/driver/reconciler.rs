//! Lifecycle orchestration

use super::types::{LifecycleRequest, Outcome, ReconciliationAttempt, Report};
use crate::config::ReconcileConfig;
use crate::error::{Error, Result, NOT_FOUND_CODE};
use crate::identity::{IdentityCodec, ResourceIdentity};
use crate::loader::{ResourceDefinition, WaitDefinition};
use crate::projection::{
    changed_fields, diff, CanonicalRecord, FieldChange, RecordShape, RemoteAttributeSet,
    StateProjector,
};
use crate::remote::{OperationHandle, RemoteApi, RemoteRequest, Submission};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::types::{JsonValue, Operation};
use crate::waiter::{ConvergenceWaiter, WaiterSpec};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// States reported while waiting for a deleted object to disappear
const PRESENT: &str = "present";
const ABSENT: &str = "absent";

/// Result of a single step before it is wrapped in a [`Report`]
struct StepResult {
    identity: Option<String>,
    outcome: Outcome,
    drift: Vec<FieldChange>,
}

impl StepResult {
    fn present(identity: &ResourceIdentity, record: CanonicalRecord) -> Self {
        let id = identity.encode();
        Self {
            identity: Some(id.clone()),
            outcome: Outcome::Present { id, record },
            drift: Vec::new(),
        }
    }

    fn absent(identity: &ResourceIdentity, outcome: Outcome) -> Self {
        Self {
            identity: Some(identity.encode()),
            outcome,
            drift: Vec::new(),
        }
    }
}

/// Drives remote objects through their lifecycle
pub struct ReconciliationDriver<R> {
    remote: R,
    config: ReconcileConfig,
    executor: RetryExecutor,
    waiter: ConvergenceWaiter,
    projector: StateProjector,
    codec: IdentityCodec,
}

impl<R: RemoteApi> ReconciliationDriver<R> {
    /// Create a driver with the default configuration
    pub fn new(remote: R) -> Self {
        Self::with_config(remote, ReconcileConfig::default())
    }

    /// Create a driver with the given configuration
    pub fn with_config(remote: R, config: ReconcileConfig) -> Self {
        let executor = config.executor();
        Self {
            remote,
            config,
            executor,
            waiter: ConvergenceWaiter::new(),
            projector: StateProjector::new(),
            codec: IdentityCodec::new(),
        }
    }

    /// The remote backend
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The active configuration
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one lifecycle step to completion.
    ///
    /// Blocks through retries and convergence waits. On error, remote
    /// effects already applied are left in place.
    pub fn reconcile(
        &self,
        definition: &ResourceDefinition,
        request: LifecycleRequest,
    ) -> Result<Report> {
        let operation = request.operation();
        let target = request.id().unwrap_or("(new)").to_string();
        let started_at = Utc::now();
        let started = Instant::now();

        info!("Starting {} of {} '{}'", operation, definition.name, target);

        let result = match request {
            LifecycleRequest::Create { desired } => self.run_create(definition, &desired),
            LifecycleRequest::Read { id } => self.run_read(definition, &id),
            LifecycleRequest::Update { id, prior, desired } => {
                self.run_update(definition, &id, &prior, &desired)
            }
            LifecycleRequest::Delete { id } => self.run_delete(definition, &id),
            LifecycleRequest::Import { id } => self.run_import(definition, &id),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let step = match result {
            Ok(step) => step,
            Err(err) => {
                warn!(
                    "{} of {} '{}' failed after {}ms: {}",
                    operation, definition.name, target, elapsed_ms, err
                );
                return Err(err);
            }
        };

        info!(
            "Finished {} of {} '{}' in {}ms",
            operation,
            definition.name,
            step.identity.as_deref().unwrap_or(&target),
            elapsed_ms
        );

        Ok(Report {
            attempt: ReconciliationAttempt {
                identity: step.identity,
                operation,
                started_at,
                outcome: step.outcome,
            },
            elapsed_ms,
            drift: step.drift,
        })
    }

    /// Provision a new object
    pub fn create(
        &self,
        definition: &ResourceDefinition,
        desired: CanonicalRecord,
    ) -> Result<Report> {
        self.reconcile(definition, LifecycleRequest::create(desired))
    }

    /// Refresh an object's canonical record
    pub fn read(&self, definition: &ResourceDefinition, id: &str) -> Result<Report> {
        self.reconcile(definition, LifecycleRequest::read(id))
    }

    /// Move an object from `prior` to `desired`
    pub fn update(
        &self,
        definition: &ResourceDefinition,
        id: &str,
        prior: CanonicalRecord,
        desired: CanonicalRecord,
    ) -> Result<Report> {
        self.reconcile(definition, LifecycleRequest::update(id, prior, desired))
    }

    /// Remove an object; removing a missing object succeeds
    pub fn delete(&self, definition: &ResourceDefinition, id: &str) -> Result<Report> {
        self.reconcile(definition, LifecycleRequest::delete(id))
    }

    /// Adopt an existing object by id
    pub fn import(&self, definition: &ResourceDefinition, id: &str) -> Result<Report> {
        self.reconcile(definition, LifecycleRequest::import(id))
    }

    // ========================================================================
    // Lifecycle steps
    // ========================================================================

    fn run_create(
        &self,
        definition: &ResourceDefinition,
        desired: &CanonicalRecord,
    ) -> Result<StepResult> {
        // local components must be valid before anything reaches the remote
        let mut components: Vec<Option<String>> = Vec::with_capacity(definition.arity());
        for (index, part) in definition.identity.iter().enumerate() {
            if part.is_assigned() {
                components.push(None);
                continue;
            }
            let value = desired
                .get(&part.field)
                .and_then(component_str)
                .ok_or_else(|| {
                    Error::invalid_request(format!(
                        "create of {} needs identity field '{}'",
                        definition.name, part.field
                    ))
                })?;
            self.codec.check_component(index, &value)?;
            components.push(Some(value));
        }

        let payload = desired.to_remote(&definition.fields).into_object();
        let request = RemoteRequest::new(
            &definition.name,
            &definition.actions.create,
            Operation::Create,
        )
        .with_payload(payload);

        let submission = self.submit(definition, &request)?;

        let mut resolved = Vec::with_capacity(components.len());
        for ((index, part), component) in definition.identity.iter().enumerate().zip(components) {
            let value = match component {
                Some(value) => value,
                None => {
                    let key = definition.output_key(part);
                    let value = submission.output_str(key).ok_or_else(|| {
                        Error::Other(format!(
                            "{} response has no '{}' to identify the new {}",
                            definition.actions.create, key, definition.name
                        ))
                    })?;
                    self.codec.check_component(index, &value)?;
                    value
                }
            };
            resolved.push(value);
        }

        let identity = ResourceIdentity::new(resolved)?;
        debug!("Created {} '{}'", definition.name, identity);

        self.await_submission(
            definition,
            &identity,
            &submission,
            definition.waits.create.as_ref(),
        )?;

        let record = self.read_after_write(definition, &identity, Operation::Create)?;
        Ok(StepResult::present(&identity, record))
    }

    fn run_read(&self, definition: &ResourceDefinition, id: &str) -> Result<StepResult> {
        let identity = self.codec.decode(id, definition.arity())?;
        let policy = self.config.read_policy(definition);

        match self.fetch(definition, &identity, &policy)? {
            Some(snapshot) => {
                let record = self.project(definition, &identity, &snapshot)?;
                Ok(StepResult::present(&identity, record))
            }
            None => {
                info!("{} '{}' no longer exists", definition.name, identity);
                Ok(StepResult::absent(&identity, Outcome::NotFound))
            }
        }
    }

    fn run_update(
        &self,
        definition: &ResourceDefinition,
        id: &str,
        prior: &CanonicalRecord,
        desired: &CanonicalRecord,
    ) -> Result<StepResult> {
        let identity = self.codec.decode(id, definition.arity())?;
        // compare canonical forms so set order and numeric strings are not changes
        let prior = &self.projector.canonicalize(prior, &definition.fields)?;
        let desired = &self.projector.canonicalize(desired, &definition.fields)?;

        for field in definition.fields.fields() {
            let locked =
                field.immutable || definition.identity.iter().any(|p| p.field == field.name);
            let changed = desired
                .get(&field.name)
                .is_some_and(|value| prior.get(&field.name) != Some(value));
            if locked && changed {
                return Err(Error::ImmutableFieldChanged {
                    field: field.name.clone(),
                });
            }
        }

        let changed = changed_fields(&definition.fields, prior, desired);
        if changed.is_empty() {
            debug!("{} '{}' has no changes to apply", definition.name, identity);
            let mut step = self.run_read(definition, id)?;
            if let Some(record) = step.outcome.record() {
                step.drift = diff(prior, record);
            }
            return Ok(step);
        }

        let names: Vec<&str> = changed.iter().map(|f| f.name.as_str()).collect();
        let action = definition.actions.update.as_ref().ok_or_else(|| {
            Error::invalid_request(format!(
                "{} cannot be updated in place; changed fields: {}",
                definition.name,
                names.join(", ")
            ))
        })?;
        debug!("Updating {} '{}' fields: {}", definition.name, identity, names.join(", "));

        let mut delta = CanonicalRecord::new();
        for field in &changed {
            if let Some(value) = desired.get(&field.name) {
                delta.insert(field.name.clone(), value.clone());
            }
        }

        let request = RemoteRequest::new(&definition.name, action, Operation::Update)
            .with_target(identity.clone(), definition.selector(&identity))
            .with_payload(delta.to_remote(&definition.fields).into_object());

        let submission = self.submit(definition, &request)?;
        self.await_submission(
            definition,
            &identity,
            &submission,
            definition.waits.update.as_ref(),
        )?;

        let record = self.read_after_write(definition, &identity, Operation::Update)?;
        let drift = diff(prior, &record);
        let mut step = StepResult::present(&identity, record);
        step.drift = drift;
        Ok(step)
    }

    fn run_delete(&self, definition: &ResourceDefinition, id: &str) -> Result<StepResult> {
        let identity = self.codec.decode(id, definition.arity())?;
        let policy = self.config.read_policy(definition);

        if self.fetch(definition, &identity, &policy)?.is_none() {
            info!("{} '{}' is already gone", definition.name, identity);
            return Ok(StepResult::absent(&identity, Outcome::Deleted));
        }

        let request = RemoteRequest::new(
            &definition.name,
            &definition.actions.delete,
            Operation::Delete,
        )
        .with_target(identity.clone(), definition.selector(&identity));

        match self.submit(definition, &request) {
            Ok(submission) => {
                self.await_submission(
                    definition,
                    &identity,
                    &submission,
                    definition.waits.delete.as_ref(),
                )?;
            }
            Err(err) if err.last_cause().is_not_found() => {
                debug!("{} '{}' vanished before delete: {}", definition.name, identity, err);
            }
            Err(err) => return Err(err),
        }

        if definition.wait_for_absence {
            self.wait_for_absence(definition, &identity)?;
        }

        Ok(StepResult::absent(&identity, Outcome::Deleted))
    }

    fn run_import(&self, definition: &ResourceDefinition, id: &str) -> Result<StepResult> {
        let identity = self.codec.decode(id, definition.arity())?;
        let policy = self.config.read_policy(definition);

        let snapshot = self
            .fetch(definition, &identity, &policy)?
            .ok_or_else(|| Error::ResourceNotFound {
                id: identity.encode(),
            })?;
        let record = self.project(definition, &identity, &snapshot)?;
        Ok(StepResult::present(&identity, record))
    }

    // ========================================================================
    // Remote access
    // ========================================================================

    fn submit(
        &self,
        definition: &ResourceDefinition,
        request: &RemoteRequest,
    ) -> Result<Submission> {
        let policy = self.config.write_policy(definition);
        let mut attempts: u32 = 0;

        self.executor.execute_action(&request.action, &policy, || {
            attempts += 1;
            if attempts > 1 && request.operation == Operation::Create {
                warn!(
                    "Retrying {} for {} after a failed attempt; the remote may hold a duplicate",
                    request.action, definition.name
                );
            }
            self.remote.submit(request)
        })
    }

    /// Fetch a snapshot; a vendor not-found error counts as absence
    fn fetch(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
        policy: &RetryPolicy,
    ) -> Result<Option<RemoteAttributeSet>> {
        self.executor
            .execute_action(&definition.actions.describe, policy, || {
                match self.remote.fetch(definition, identity) {
                    Err(err) if err.is_not_found() => Ok(None),
                    other => other,
                }
            })
    }

    /// Fetch after a write, retrying while the object is not visible yet
    fn read_after_write(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
        operation: Operation,
    ) -> Result<CanonicalRecord> {
        let policy = self.config.read_policy(definition);

        match self.fetch_visible(definition, identity, &policy) {
            Ok(snapshot) => self.project(definition, identity, &snapshot),
            Err(err) if err.last_cause().is_not_found() => Err(Error::ResourceVanished {
                id: identity.encode(),
                operation,
            }),
            Err(err) => Err(err),
        }
    }

    /// Fetch an object that must exist, treating absence as retryable
    fn fetch_visible(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
        policy: &RetryPolicy,
    ) -> Result<RemoteAttributeSet> {
        let policy = policy.clone().retry_codes([NOT_FOUND_CODE]);
        self.executor
            .execute_action(&definition.actions.describe, &policy, || {
                self.remote.fetch(definition, identity)?.ok_or_else(|| {
                    Error::remote(NOT_FOUND_CODE, format!("'{identity}' is not visible yet"))
                })
            })
    }

    fn await_submission(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
        submission: &Submission,
        wait: Option<&WaitDefinition>,
    ) -> Result<()> {
        let Some(wait) = wait else {
            if let Some(handle) = &submission.handle {
                debug!("No wait states for {}, not polling '{}'", definition.name, handle);
            }
            return Ok(());
        };

        let spec = wait.to_spec(
            self.config.write_timeout(definition),
            self.config.poll_interval(),
        );
        let state = match (&wait.status_field, &submission.handle) {
            (Some(field), _) => self.wait_on_status(definition, &spec, identity, field)?,
            (None, Some(handle)) => self.wait_on(definition, &spec, handle)?,
            (None, None) => {
                warn!(
                    "{} declares wait states but '{}' returned no operation to poll \
                     and no status_field is set; not waiting",
                    definition.name, identity
                );
                return Ok(());
            }
        };
        debug!("{} '{}' reached '{}'", definition.name, identity, state);
        Ok(())
    }

    /// Read policy whose budget ends no later than `deadline`
    fn probe_policy(&self, definition: &ResourceDefinition, deadline: Instant) -> RetryPolicy {
        let policy = self.config.read_policy(definition);
        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = policy.max_elapsed.min(remaining);
        policy.with_max_elapsed(budget)
    }

    fn wait_on(
        &self,
        definition: &ResourceDefinition,
        spec: &WaiterSpec,
        handle: &OperationHandle,
    ) -> Result<String> {
        let deadline = Instant::now() + spec.timeout;
        self.waiter.wait(spec, || {
            let policy = self.probe_policy(definition, deadline);
            self.executor.execute(&policy, || self.remote.probe(handle))
        })
    }

    /// Poll the described object until `field` reaches a target state
    fn wait_on_status(
        &self,
        definition: &ResourceDefinition,
        spec: &WaiterSpec,
        identity: &ResourceIdentity,
        field: &str,
    ) -> Result<String> {
        let deadline = Instant::now() + spec.timeout;
        self.waiter.wait(spec, || {
            let policy = self.probe_policy(definition, deadline);
            let snapshot = self.fetch_visible(definition, identity, &policy)?;
            let record = self.project(definition, identity, &snapshot)?;
            Ok(record.get(field).and_then(component_str).unwrap_or_default())
        })
    }

    fn wait_for_absence(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
    ) -> Result<()> {
        let spec = WaiterSpec::new([ABSENT])
            .pending([PRESENT])
            .timeout(self.config.write_timeout(definition))
            .poll_interval(self.config.poll_interval());
        let deadline = Instant::now() + spec.timeout;

        self.waiter.wait(&spec, || {
            let policy = self.probe_policy(definition, deadline);
            let snapshot = self.fetch(definition, identity, &policy)?;
            Ok(if snapshot.is_some() { PRESENT } else { ABSENT }.to_string())
        })?;
        Ok(())
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Project a snapshot, filling declared identity fields the remote omits
    fn project(
        &self,
        definition: &ResourceDefinition,
        identity: &ResourceIdentity,
        snapshot: &RemoteAttributeSet,
    ) -> Result<CanonicalRecord> {
        let mut record = self.projector.project(snapshot, &definition.fields)?;

        for (part, component) in definition.identity.iter().zip(identity.components()) {
            let Some(field) = definition.fields.field(&part.field) else {
                continue;
            };
            if record.contains(&field.name) {
                continue;
            }
            let single = RemoteAttributeSet::new().with(field.remote_name(), component.as_str());
            let shape = RecordShape::new(vec![field.clone()]);
            if let Some(value) = self.projector.project(&single, &shape)?.get(&field.name) {
                record.insert(field.name.clone(), value.clone());
            }
        }

        Ok(record)
    }
}

impl<R> std::fmt::Debug for ReconciliationDriver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationDriver")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Render a record value as an identity component
fn component_str(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
