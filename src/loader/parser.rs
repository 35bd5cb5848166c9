//! YAML parser for resource definitions
//!
//! Parses and validates resource definition files.

use crate::error::{Error, Result, ResultExt};
use crate::loader::types::{ResourceDefinition, WaitDefinition};
use crate::retry::DEFAULT_READ_TIMEOUT;
use crate::waiter::DEFAULT_POLL_INTERVAL;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load a resource definition from a YAML file
pub fn load_definition(path: impl AsRef<Path>) -> Result<ResourceDefinition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read resource definition '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_definition_from_str(&content)
}

/// Load a resource definition from a YAML string
pub fn load_definition_from_str(yaml: &str) -> Result<ResourceDefinition> {
    let def: ResourceDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse resource YAML: {e}")))?;

    validate_definition(&def)?;
    Ok(def)
}

/// Validate a resource definition
pub fn validate_definition(def: &ResourceDefinition) -> Result<()> {
    if def.name.is_empty() {
        return Err(Error::config("Resource name cannot be empty"));
    }

    def.fields
        .validate()
        .with_context(|| format!("Resource '{}'", def.name))?;

    validate_identity(def)?;

    let actions = [
        ("create", Some(&def.actions.create)),
        ("describe", Some(&def.actions.describe)),
        ("update", def.actions.update.as_ref()),
        ("delete", Some(&def.actions.delete)),
    ];
    for (step, action) in actions {
        if action.is_some_and(|a| a.is_empty()) {
            return Err(Error::config(format!(
                "Resource '{}' {} action cannot be empty",
                def.name, step
            )));
        }
    }

    let waits = [
        ("create", &def.waits.create),
        ("update", &def.waits.update),
        ("delete", &def.waits.delete),
    ];
    for (step, wait) in waits {
        if let Some(wait) = wait {
            validate_wait(def, step, wait)?;
        }
    }

    Ok(())
}

fn validate_identity(def: &ResourceDefinition) -> Result<()> {
    if def.identity.is_empty() {
        return Err(Error::config(format!(
            "Resource '{}' must declare at least one identity part",
            def.name
        )));
    }

    let mut seen = HashSet::new();
    for part in &def.identity {
        if !seen.insert(part.field.as_str()) {
            return Err(Error::config(format!(
                "Resource '{}' lists identity field '{}' twice",
                def.name, part.field
            )));
        }
        // local parts are read from the desired record, so they must be declared
        if !part.is_assigned() && def.fields.field(&part.field).is_none() {
            return Err(Error::config(format!(
                "Resource '{}' identity field '{}' is not a declared field",
                def.name, part.field
            )));
        }
        if !part.is_assigned() && part.output.is_some() {
            return Err(Error::config(format!(
                "Resource '{}' identity field '{}' is local and cannot name an output",
                def.name, part.field
            )));
        }
    }

    Ok(())
}

fn validate_wait(def: &ResourceDefinition, step: &str, wait: &WaitDefinition) -> Result<()> {
    let name = &def.name;
    if let Some(field) = &wait.status_field {
        if step == "delete" {
            return Err(Error::config(format!(
                "Resource '{name}' delete wait cannot poll status field '{field}'; \
                 use wait_for_absence"
            )));
        }
        if def.fields.field(field).is_none() {
            return Err(Error::config(format!(
                "Resource '{name}' {step} wait status field '{field}' is not a declared field"
            )));
        }
    }
    if wait.poll_interval_ms == Some(0) {
        return Err(Error::config(format!(
            "Resource '{name}' {step} wait poll_interval_ms must be positive"
        )));
    }
    wait.to_spec(DEFAULT_READ_TIMEOUT, DEFAULT_POLL_INTERVAL)
        .validate()
        .with_context(|| format!("Resource '{name}' {step} wait"))
}
