//! Projection of remote snapshots into canonical records

use super::types::{
    empty_for, join_path, json_type_name, slot_in, CanonicalRecord, FieldShape, FieldType,
    RecordShape, RemoteAttributeSet, Slot,
};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Projects remote snapshots through a [`RecordShape`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StateProjector;

impl StateProjector {
    /// Create a projector
    pub fn new() -> Self {
        Self
    }

    /// Project `remote` into a canonical record.
    ///
    /// Present fields are projected, explicit nulls become the field's empty
    /// value, absent fields are omitted. Remote fields the shape does not
    /// declare are ignored.
    pub fn project(
        &self,
        remote: &RemoteAttributeSet,
        shape: &RecordShape,
    ) -> Result<CanonicalRecord> {
        let object = project_fields(remote.as_object(), shape.fields(), "")?;
        Ok(CanonicalRecord::from_object(object))
    }

    /// Bring a locally built record into canonical form.
    ///
    /// Sets come back sorted, numeric strings as numbers, and undeclared
    /// fields are dropped, so the result compares equal to a projection of
    /// the same remote state.
    pub fn canonicalize(
        &self,
        record: &CanonicalRecord,
        shape: &RecordShape,
    ) -> Result<CanonicalRecord> {
        self.project(&record.to_remote(shape), shape)
    }
}

/// Project `remote` through `shape` with the default projector
pub fn project(remote: &RemoteAttributeSet, shape: &RecordShape) -> Result<CanonicalRecord> {
    StateProjector::new().project(remote, shape)
}

fn project_fields(remote: &JsonObject, fields: &[FieldShape], path: &str) -> Result<JsonObject> {
    let mut record = JsonObject::new();

    for field in fields {
        let field_path = join_path(path, &field.name);
        match slot_in(remote, field.remote_name()) {
            Slot::Absent => {}
            Slot::ExplicitNull => {
                record.insert(field.name.clone(), field.empty_value());
            }
            Slot::Present(value) => {
                let projected = project_value(field, field.field_type, value, &field_path)?;
                record.insert(field.name.clone(), projected);
            }
        }
    }

    Ok(record)
}

/// Project a single value through `field`'s own type
pub(crate) fn project_field_value(
    field: &FieldShape,
    value: &JsonValue,
    path: &str,
) -> Result<JsonValue> {
    project_value(field, field.field_type, value, path)
}

fn project_value(
    field: &FieldShape,
    field_type: FieldType,
    value: &JsonValue,
    path: &str,
) -> Result<JsonValue> {
    let mismatch = || Error::shape_mismatch(path, field_type.to_string(), json_type_name(value));

    match field_type {
        FieldType::String => match value {
            JsonValue::String(_) => Ok(value.clone()),
            JsonValue::Number(n) => Ok(JsonValue::String(n.to_string())),
            _ => Err(mismatch()),
        },
        FieldType::Integer => match value {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            JsonValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map(JsonValue::from)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        FieldType::Float => match value {
            JsonValue::Number(n) => n.as_f64().map(JsonValue::from).ok_or_else(mismatch),
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(JsonValue::from)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldType::Bool => match value {
            JsonValue::Bool(_) => Ok(value.clone()),
            JsonValue::String(s) if s == "true" || s == "false" => Ok(JsonValue::Bool(s == "true")),
            _ => Err(mismatch()),
        },
        FieldType::List | FieldType::Set => {
            let JsonValue::Array(items) = value else {
                return Err(mismatch());
            };
            let mut projected = items
                .iter()
                .enumerate()
                .map(|(i, item)| project_element(field, item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>>>()?;
            if field_type == FieldType::Set {
                canonicalize_set(&mut projected);
            }
            Ok(JsonValue::Array(projected))
        }
        FieldType::Map => {
            let JsonValue::Object(entries) = value else {
                return Err(mismatch());
            };
            let mut projected = JsonObject::new();
            for (key, item) in entries {
                let item = project_element(field, item, &join_path(path, key))?;
                projected.insert(key.clone(), item);
            }
            Ok(JsonValue::Object(projected))
        }
        FieldType::Object => {
            let JsonValue::Object(nested) = value else {
                return Err(mismatch());
            };
            Ok(JsonValue::Object(project_fields(nested, &field.fields, path)?))
        }
    }
}

/// Project one element of a list, set or map
fn project_element(field: &FieldShape, item: &JsonValue, path: &str) -> Result<JsonValue> {
    let item_type = field.item_type();
    if item.is_null() {
        return Ok(empty_for(item_type));
    }
    if item_type == FieldType::Object {
        let JsonValue::Object(nested) = item else {
            return Err(Error::shape_mismatch(path, "object", json_type_name(item)));
        };
        return Ok(JsonValue::Object(project_fields(nested, &field.fields, path)?));
    }
    project_value(field, item_type, item, path)
}

/// Sort by canonical JSON text and drop duplicates
fn canonicalize_set(items: &mut Vec<JsonValue>) {
    let mut keyed: Vec<(String, JsonValue)> = items
        .drain(..)
        .map(|v| (v.to_string(), v))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    items.extend(keyed.into_iter().map(|(_, v)| v));
}

// ============================================================================
// Re-serialization
// ============================================================================

impl CanonicalRecord {
    /// Rename fields back to their remote names.
    ///
    /// Used to build request payloads. Fields the shape does not declare are
    /// dropped. Projecting the result yields this record again.
    pub fn to_remote(&self, shape: &RecordShape) -> RemoteAttributeSet {
        RemoteAttributeSet::from_object(fields_to_remote(self.as_object(), shape.fields()))
    }
}

fn fields_to_remote(record: &JsonObject, fields: &[FieldShape]) -> JsonObject {
    let mut remote = JsonObject::new();
    for field in fields {
        if let Some(value) = record.get(&field.name) {
            remote.insert(field.remote_name().to_string(), value_to_remote(field, value));
        }
    }
    remote
}

fn value_to_remote(field: &FieldShape, value: &JsonValue) -> JsonValue {
    let nested_items = field.field_type.is_collection() && field.item_type() == FieldType::Object;
    match value {
        JsonValue::Object(nested) if field.field_type == FieldType::Object => {
            JsonValue::Object(fields_to_remote(nested, &field.fields))
        }
        JsonValue::Array(items) if nested_items => JsonValue::Array(
            items
                .iter()
                .map(|item| match item {
                    JsonValue::Object(nested) => {
                        JsonValue::Object(fields_to_remote(nested, &field.fields))
                    }
                    other => other.clone(),
                })
                .collect(),
        ),
        JsonValue::Object(entries) if nested_items => JsonValue::Object(
            entries
                .iter()
                .map(|(key, item)| {
                    let item = match item {
                        JsonValue::Object(nested) => {
                            JsonValue::Object(fields_to_remote(nested, &field.fields))
                        }
                        other => other.clone(),
                    };
                    (key.clone(), item)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

// ============================================================================
// Drift
// ============================================================================

/// One top-level field that differs between two records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Canonical field name
    pub field: String,
    /// Value in the earlier record, `None` if absent
    pub before: Option<JsonValue>,
    /// Value in the later record, `None` if absent
    pub after: Option<JsonValue>,
}

/// Fields that drifted between two projections, in sorted field order
pub fn diff(previous: &CanonicalRecord, current: &CanonicalRecord) -> Vec<FieldChange> {
    let mut names: Vec<&str> = previous.field_names().chain(current.field_names()).collect();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .filter_map(|name| {
            let before = previous.get(name);
            let after = current.get(name);
            (before != after).then(|| FieldChange {
                field: name.to_string(),
                before: before.cloned(),
                after: after.cloned(),
            })
        })
        .collect()
}

/// Declared fields that `desired` sets to a value different from `prior`.
///
/// Fields missing from `desired` are not requested changes. Both records are
/// compared as given; pass them through [`StateProjector::canonicalize`] when
/// they were not produced by a projection.
pub fn changed_fields<'a>(
    shape: &'a RecordShape,
    prior: &CanonicalRecord,
    desired: &CanonicalRecord,
) -> Vec<&'a FieldShape> {
    shape
        .fields()
        .iter()
        .filter(|field| match desired.get(&field.name) {
            Some(value) => prior.get(&field.name) != Some(value),
            None => false,
        })
        .collect()
}
