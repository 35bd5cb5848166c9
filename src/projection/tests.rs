//! Tests for state projection

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

fn bucket_shape() -> RecordShape {
    RecordShape::new(vec![
        FieldShape::string("bucket").remote("Bucket").immutable(),
        FieldShape::string("acl").remote("ACL"),
        FieldShape::integer("max_age").remote("MaxAgeSeconds"),
        FieldShape::bool("versioning").remote("VersioningEnabled"),
        FieldShape::list("origins", FieldType::String).remote("AllowedOrigins"),
        FieldShape::set("methods", FieldType::String).remote("AllowedMethods"),
        FieldShape::map("tags", FieldType::String).remote("Tags"),
        FieldShape::object(
            "lifecycle",
            vec![
                FieldShape::string("status").remote("Status"),
                FieldShape::integer("expire_days").remote("ExpireDays"),
            ],
        )
        .remote("Lifecycle"),
        FieldShape::list_of(
            "rules",
            vec![
                FieldShape::string("id").remote("ID"),
                FieldShape::string("prefix").remote("Prefix"),
            ],
        )
        .remote("Rules"),
    ])
}

fn snapshot() -> RemoteAttributeSet {
    RemoteAttributeSet::from_json(json!({
        "Bucket": "logs-1250000000",
        "ACL": "private",
        "MaxAgeSeconds": "600",
        "VersioningEnabled": true,
        "AllowedOrigins": ["https://b.example", "https://a.example"],
        "AllowedMethods": ["PUT", "GET", "PUT"],
        "Tags": {"env": "prod", "team": "infra"},
        "Lifecycle": {"Status": "Enabled", "ExpireDays": 30, "Unused": 1},
        "Rules": [
            {"ID": "r2", "Prefix": "tmp/"},
            {"ID": "r1", "Prefix": null}
        ],
        "CreationDate": "2024-01-01T00:00:00Z"
    }))
    .unwrap()
}

// ============================================================================
// Slot Tests
// ============================================================================

#[test]
fn test_slots() {
    let remote = RemoteAttributeSet::new().with("a", 1).with_null("b");
    assert_eq!(remote.slot("a"), Slot::Present(&json!(1)));
    assert_eq!(remote.slot("b"), Slot::ExplicitNull);
    assert_eq!(remote.slot("c"), Slot::Absent);
}

#[test]
fn test_remote_must_be_object() {
    let err = RemoteAttributeSet::from_json(json!([1, 2])).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

// ============================================================================
// Projection Tests
// ============================================================================

#[test]
fn test_project_full_snapshot() {
    let record = project(&snapshot(), &bucket_shape()).unwrap();

    let expected = CanonicalRecord::from_json(json!({
        "bucket": "logs-1250000000",
        "acl": "private",
        "max_age": 600,
        "versioning": true,
        "origins": ["https://b.example", "https://a.example"],
        "methods": ["GET", "PUT"],
        "tags": {"env": "prod", "team": "infra"},
        "lifecycle": {"status": "Enabled", "expire_days": 30},
        "rules": [
            {"id": "r2", "prefix": "tmp/"},
            {"id": "r1", "prefix": ""}
        ]
    }))
    .unwrap();

    assert_eq!(record, expected);
}

#[test]
fn test_absent_and_null_are_distinct() {
    let shape = RecordShape::new(vec![
        FieldShape::string("description"),
        FieldShape::list("ports", FieldType::Integer),
        FieldShape::string("owner"),
    ]);
    let remote = RemoteAttributeSet::new()
        .with_null("description")
        .with_null("ports");

    let record = project(&remote, &shape).unwrap();

    assert_eq!(record.get("description"), Some(&json!("")));
    assert_eq!(record.get("ports"), Some(&json!([])));
    assert!(!record.contains("owner"));
    assert_eq!(record.len(), 2);
}

#[test]
fn test_empty_override() {
    let shape = RecordShape::new(vec![FieldShape::integer("quota").empty(-1)]);
    let remote = RemoteAttributeSet::new().with_null("quota");
    let record = project(&remote, &shape).unwrap();
    assert_eq!(record.get("quota"), Some(&json!(-1)));
}

#[test]
fn test_absent_nested_field_omitted() {
    let remote =
        RemoteAttributeSet::from_json(json!({"Lifecycle": {"Status": "Disabled"}})).unwrap();
    let record = project(&remote, &bucket_shape()).unwrap();
    assert_eq!(record.get("lifecycle"), Some(&json!({"status": "Disabled"})));
}

#[test]
fn test_list_keeps_order() {
    let shape = RecordShape::new(vec![FieldShape::list("zones", FieldType::String)]);
    let remote = RemoteAttributeSet::new().with("zones", json!(["c", "a", "b"]));
    let record = project(&remote, &shape).unwrap();
    assert_eq!(record.get("zones"), Some(&json!(["c", "a", "b"])));
}

#[test]
fn test_set_sorted_and_deduplicated() {
    let shape = RecordShape::new(vec![FieldShape::set("ids", FieldType::Integer)]);
    let remote = RemoteAttributeSet::new().with("ids", json!([3, "1", 2, 3, 1]));
    let record = project(&remote, &shape).unwrap();
    assert_eq!(record.get("ids"), Some(&json!([1, 2, 3])));
}

#[test]
fn test_scalar_coercions() {
    let shape = RecordShape::new(vec![
        FieldShape::string("port"),
        FieldShape::float("ratio"),
        FieldShape::bool("enabled"),
    ]);
    let remote = RemoteAttributeSet::new()
        .with("port", 8080)
        .with("ratio", "0.5")
        .with("enabled", "false");
    let record = project(&remote, &shape).unwrap();
    assert_eq!(record.get_str("port"), Some("8080"));
    assert_eq!(record.get("ratio"), Some(&json!(0.5)));
    assert_eq!(record.get("enabled"), Some(&json!(false)));
}

#[test]
fn test_shape_mismatch_reports_path() {
    let remote =
        RemoteAttributeSet::from_json(json!({"Lifecycle": {"ExpireDays": "soon"}})).unwrap();
    let err = project(&remote, &bucket_shape()).unwrap_err();
    match err {
        Error::ShapeMismatch {
            field,
            expected,
            found,
        } => {
            assert_eq!(field, "lifecycle.expire_days");
            assert_eq!(expected, "integer");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_shape_mismatch_for_list_element() {
    let remote = RemoteAttributeSet::from_json(json!({"Rules": ["r1"]})).unwrap();
    let err = project(&remote, &bucket_shape()).unwrap_err();
    assert!(err.to_string().contains("rules[0]"));
}

#[test]
fn test_projection_is_deterministic() {
    let shape = bucket_shape();
    let first = project(&snapshot(), &shape).unwrap().to_json_string();
    let second = project(&snapshot(), &shape).unwrap().to_json_string();
    assert_eq!(first, second);
}

#[test]
fn test_projection_is_idempotent_through_remote() {
    let shape = bucket_shape();
    let record = project(&snapshot(), &shape).unwrap();
    let again = project(&record.to_remote(&shape), &shape).unwrap();
    assert_eq!(record.to_json_string(), again.to_json_string());
}

#[test]
fn test_to_remote_renames_nested() {
    let shape = bucket_shape();
    let record = CanonicalRecord::new()
        .with("bucket", "b-1")
        .with("lifecycle", json!({"status": "Enabled"}))
        .with("rules", json!([{"id": "r1"}]))
        .with("undeclared", 1);

    let remote = record.to_remote(&shape);
    assert_eq!(
        remote.into_json(),
        json!({
            "Bucket": "b-1",
            "Lifecycle": {"Status": "Enabled"},
            "Rules": [{"ID": "r1"}]
        })
    );
}

// ============================================================================
// Drift Tests
// ============================================================================

#[test]
fn test_diff() {
    let before = CanonicalRecord::new()
        .with("acl", "private")
        .with("max_age", 600)
        .with("bucket", "b");
    let after = CanonicalRecord::new()
        .with("acl", "public-read")
        .with("bucket", "b")
        .with("versioning", true);

    let changes = diff(&before, &after);
    let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["acl", "max_age", "versioning"]);
    assert_eq!(changes[1].after, None);
    assert_eq!(changes[2].before, None);
    assert!(diff(&before, &before).is_empty());
}

#[test]
fn test_changed_fields() {
    let shape = bucket_shape();
    let prior = CanonicalRecord::new()
        .with("bucket", "b")
        .with("acl", "private")
        .with("max_age", 600);
    let desired = CanonicalRecord::new()
        .with("bucket", "b")
        .with("acl", "public-read");

    let changed: Vec<&str> = changed_fields(&shape, &prior, &desired)
        .into_iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(changed, vec!["acl"]);
}

#[test]
fn test_canonicalize_local_record() {
    let shape = bucket_shape();
    let local = CanonicalRecord::new()
        .with("methods", json!(["PUT", "GET", "PUT"]))
        .with("max_age", "600")
        .with("not_declared", 1);

    let canonical = StateProjector::new().canonicalize(&local, &shape).unwrap();
    assert_eq!(
        canonical,
        CanonicalRecord::new()
            .with("methods", json!(["GET", "PUT"]))
            .with("max_age", 600)
    );

    let prior = CanonicalRecord::new().with("methods", json!(["GET", "PUT"]));
    assert!(changed_fields(&shape, &prior, &canonical)
        .iter()
        .all(|f| f.name != "methods"));
}

// ============================================================================
// Shape Validation Tests
// ============================================================================

#[test]
fn test_shape_validate() {
    assert!(bucket_shape().validate().is_ok());

    let duplicate = RecordShape::new(vec![FieldShape::string("a"), FieldShape::integer("a")]);
    assert!(duplicate.validate().is_err());

    let remote_clash = RecordShape::new(vec![
        FieldShape::string("a").remote("X"),
        FieldShape::string("b").remote("X"),
    ]);
    assert!(remote_clash.validate().is_err());

    let mut scalar_with_fields = FieldShape::string("a");
    scalar_with_fields.fields = vec![FieldShape::string("b")];
    assert!(RecordShape::new(vec![scalar_with_fields]).validate().is_err());

    let nested_collection = RecordShape::new(vec![FieldShape::list("a", FieldType::Set)]);
    assert!(nested_collection.validate().is_err());

    let mistyped_empty = RecordShape::new(vec![FieldShape::integer("count").empty("n/a")]);
    assert!(mistyped_empty.validate().is_err());

    let float_empty = RecordShape::new(vec![FieldShape::float("ratio").empty(0)]);
    let err = float_empty.validate().unwrap_err();
    assert!(err.to_string().contains("use 0.0"));
}

#[test]
fn test_shape_from_yaml() {
    let yaml = r#"
- name: bucket
  remote: Bucket
  immutable: true
- name: tags
  type: map
- name: rules
  type: list
  items: object
  fields:
    - name: id
      remote: ID
"#;
    let shape: RecordShape = serde_yaml::from_str(yaml).unwrap();
    assert!(shape.validate().is_ok());
    assert_eq!(shape.fields().len(), 3);
    assert_eq!(shape.field("bucket").unwrap().remote_name(), "Bucket");
    assert_eq!(shape.field("tags").unwrap().item_type(), FieldType::String);
    assert_eq!(
        shape.immutable_fields().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["bucket"]
    );
}
