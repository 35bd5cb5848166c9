//! Tests for YAML loader module

use super::*;
use crate::identity::ResourceIdentity;
use crate::projection::FieldType;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

const INSTANCE: &str = r#"
name: cvm_instance
description: Compute instance
identity:
  - field: region
  - field: instance_id
    source: assigned
fields:
  - name: region
    remote: Region
    immutable: true
  - name: instance_id
    remote: InstanceId
  - name: instance_name
    remote: InstanceName
  - name: security_groups
    remote: SecurityGroupIds
    type: set
actions:
  create: RunInstances
  describe: DescribeInstances
  update: ModifyInstancesAttribute
  delete: TerminateInstances
waits:
  create:
    pending: [PENDING]
    target: [RUNNING]
    failure: [LAUNCH_FAILED]
    poll_interval_ms: 200
timeouts:
  write_timeout_ms: 60000
"#;

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_definition() {
    let yaml = r#"
name: cos_bucket
identity:
  - field: bucket
fields:
  - name: bucket
actions:
  create: PutBucket
  describe: HeadBucket
  delete: DeleteBucket
"#;

    let def = load_definition_from_str(yaml).unwrap();
    assert_eq!(def.name, "cos_bucket");
    assert_eq!(def.arity(), 1);
    assert_eq!(def.identity[0].source, IdentitySource::Local);
    assert!(def.actions.update.is_none());
    assert!(def.waits.create.is_none());
    assert!(!def.wait_for_absence);
    assert_eq!(def.timeouts.read_timeout_ms, None);
}

#[test]
fn test_load_full_definition() {
    let def = load_definition_from_str(INSTANCE).unwrap();

    assert_eq!(def.description.as_deref(), Some("Compute instance"));
    assert_eq!(def.arity(), 2);
    assert!(def.identity[1].is_assigned());
    assert_eq!(def.fields.fields().len(), 4);
    assert_eq!(
        def.fields.field("security_groups").unwrap().field_type,
        FieldType::Set
    );
    assert_eq!(
        def.actions.update.as_deref(),
        Some("ModifyInstancesAttribute")
    );
    assert_eq!(def.timeouts.write_timeout_ms, Some(60_000));

    let wait = def.waits.create.as_ref().unwrap();
    let spec = wait.to_spec(Duration::from_secs(5), Duration::from_secs(1));
    assert_eq!(spec.poll_interval, Duration::from_millis(200));
    assert_eq!(spec.timeout, Duration::from_secs(5));
    assert!(spec.failure.contains("LAUNCH_FAILED"));
}

#[test]
fn test_identity_keys_and_selector() {
    let def = load_definition_from_str(INSTANCE).unwrap();

    assert_eq!(def.remote_key(&def.identity[0]), "Region");
    assert_eq!(def.output_key(&def.identity[1]), "InstanceId");

    let id = ResourceIdentity::new(["ap-guangzhou", "ins-1"]).unwrap();
    let selector = def.selector(&id);
    assert_eq!(
        serde_json::Value::Object(selector),
        json!({"Region": "ap-guangzhou", "InstanceId": "ins-1"})
    );
}

#[test]
fn test_output_key_override() {
    let part = IdentityPart::assigned("listener_id").from_output("ListenerIds");
    let yaml = INSTANCE.replace("source: assigned", "source: assigned\n    output: ListenerIds");
    let def = load_definition_from_str(&yaml).unwrap();
    assert_eq!(def.output_key(&part), "ListenerIds");
    assert_eq!(def.output_key(&def.identity[1]), "ListenerIds");
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{INSTANCE}").unwrap();

    let def = load_definition(file.path()).unwrap();
    assert_eq!(def.name, "cvm_instance");

    let err = load_definition("/nonexistent/resource.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read resource definition"));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_reject_empty_identity() {
    let yaml = r#"
name: thing
identity: []
actions:
  create: A
  describe: B
  delete: C
"#;
    let err = load_definition_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("at least one identity part"));
}

#[test]
fn test_reject_undeclared_local_identity() {
    let yaml = r#"
name: thing
identity:
  - field: missing
actions:
  create: A
  describe: B
  delete: C
"#;
    let err = load_definition_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("not a declared field"));
}

#[test]
fn test_reject_duplicate_fields() {
    let yaml = r#"
name: thing
identity:
  - field: a
fields:
  - name: a
  - name: a
actions:
  create: A
  describe: B
  delete: C
"#;
    assert!(load_definition_from_str(yaml).is_err());
}

#[test]
fn test_reject_overlapping_wait_states() {
    let yaml = INSTANCE.replace("failure: [LAUNCH_FAILED]", "failure: [RUNNING]");
    let err = load_definition_from_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("create wait"));
}

#[test]
fn test_reject_empty_action() {
    let yaml = INSTANCE.replace("describe: DescribeInstances", "describe: \"\"");
    let err = load_definition_from_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("describe action cannot be empty"));
}

const COUNTER: &str = r#"
name: counter
identity:
  - field: id
fields:
  - name: id
  - name: count
    type: integer
    empty: EMPTY
actions:
  create: A
  describe: B
  delete: C
"#;

#[test]
fn test_reject_empty_value_of_wrong_type() {
    let err = load_definition_from_str(&COUNTER.replace("EMPTY", "\"n/a\"")).unwrap_err();
    assert!(err.to_string().contains("does not fit type integer"));

    let err = load_definition_from_str(&COUNTER.replace("EMPTY", "\"7\"")).unwrap_err();
    assert!(err.to_string().contains("use 7"));

    let def = load_definition_from_str(&COUNTER.replace("EMPTY", "-1")).unwrap();
    assert_eq!(def.fields.field("count").unwrap().empty_value(), json!(-1));
}

#[test]
fn test_reject_unsorted_set_empty_value() {
    let yaml = COUNTER
        .replace("type: integer", "type: set")
        .replace("EMPTY", "[b, a]");
    let err = load_definition_from_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("not canonical"));

    let yaml = COUNTER
        .replace("type: integer", "type: set")
        .replace("EMPTY", "[a, b]");
    assert!(load_definition_from_str(&yaml).is_ok());
}

#[test]
fn test_status_field_wait() {
    let yaml = INSTANCE
        .replace(
            "    type: set\n",
            "    type: set\n  - name: status\n    remote: InstanceState\n",
        )
        .replace(
            "    poll_interval_ms: 200",
            "    poll_interval_ms: 200\n    status_field: status",
        );
    let def = load_definition_from_str(&yaml).unwrap();
    let wait = def.waits.create.as_ref().unwrap();
    assert_eq!(wait.status_field.as_deref(), Some("status"));
}

#[test]
fn test_reject_undeclared_status_field() {
    let yaml = INSTANCE.replace(
        "    poll_interval_ms: 200",
        "    poll_interval_ms: 200\n    status_field: state",
    );
    let err = load_definition_from_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("status field 'state' is not a declared field"));
}

#[test]
fn test_reject_status_field_on_delete_wait() {
    let yaml = INSTANCE.replace(
        "timeouts:",
        "  delete:\n    target: [DELETED]\n    status_field: instance_name\ntimeouts:",
    );
    let err = load_definition_from_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("use wait_for_absence"));
}

#[test]
fn test_reject_invalid_yaml() {
    let err = load_definition_from_str("name: [unclosed").unwrap_err();
    assert!(err.to_string().contains("Failed to parse resource YAML"));
}
