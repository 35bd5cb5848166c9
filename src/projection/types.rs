//! Projection types
//!
//! Remote snapshots, field shapes, and canonical records.

use super::projector::project_field_value;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Remote Attribute Set
// ============================================================================

/// One field slot of a remote snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    /// The remote returned a value
    Present(&'a JsonValue),
    /// The remote returned the field with no value
    ExplicitNull,
    /// The response never carried the field
    Absent,
}

/// Sparse snapshot of a remote object, keyed by remote field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteAttributeSet(JsonObject);

impl RemoteAttributeSet {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object
    pub fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(object) => Ok(Self(object)),
            other => Err(Error::shape_mismatch(
                "$",
                "object",
                json_type_name(&other),
            )),
        }
    }

    /// Set a present field
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set an explicitly null field
    #[must_use]
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), JsonValue::Null);
        self
    }

    /// Read the slot for a remote field name
    pub fn slot(&self, name: &str) -> Slot<'_> {
        slot_in(&self.0, name)
    }

    /// Underlying JSON object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Unwrap the JSON object
    pub fn into_object(self) -> JsonObject {
        self.0
    }

    /// Convert into a JSON value
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

pub(crate) fn slot_in<'a>(object: &'a JsonObject, name: &str) -> Slot<'a> {
    match object.get(name) {
        None => Slot::Absent,
        Some(JsonValue::Null) => Slot::ExplicitNull,
        Some(value) => Slot::Present(value),
    }
}

// ============================================================================
// Field Shape
// ============================================================================

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Float,
    Bool,
    /// Ordered sequence; remote order is kept
    List,
    /// Unordered collection; deduplicated and sorted
    Set,
    /// String-keyed map
    Map,
    /// Nested record
    Object,
}

impl FieldType {
    /// Whether values of this type hold other values
    pub fn is_collection(self) -> bool {
        matches!(self, FieldType::List | FieldType::Set | FieldType::Map)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Float => write!(f, "float"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::List => write!(f, "list"),
            FieldType::Set => write!(f, "set"),
            FieldType::Map => write!(f, "map"),
            FieldType::Object => write!(f, "object"),
        }
    }
}

/// Declaration of one canonical field and where it lives remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldShape {
    /// Local (canonical) field name
    pub name: String,

    /// Remote field name, if different from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Field type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Element type for lists, sets and maps (defaults to string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldType>,

    /// Nested fields for objects, or for collection elements of type object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldShape>,

    /// The remote API rejects changes to this field after creation
    #[serde(default)]
    pub immutable: bool,

    /// Value used when the remote returns an explicit null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty: Option<JsonValue>,
}

impl FieldShape {
    /// Create a field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            remote: None,
            field_type,
            items: None,
            fields: Vec::new(),
            immutable: false,
            empty: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Ordered list of scalars
    pub fn list(name: impl Into<String>, items: FieldType) -> Self {
        Self::new(name, FieldType::List).with_items(items)
    }

    /// Unordered set of scalars
    pub fn set(name: impl Into<String>, items: FieldType) -> Self {
        Self::new(name, FieldType::Set).with_items(items)
    }

    /// String-keyed map of scalars
    pub fn map(name: impl Into<String>, items: FieldType) -> Self {
        Self::new(name, FieldType::Map).with_items(items)
    }

    /// Nested record
    pub fn object(name: impl Into<String>, fields: Vec<FieldShape>) -> Self {
        let mut shape = Self::new(name, FieldType::Object);
        shape.fields = fields;
        shape
    }

    /// Ordered list of nested records
    pub fn list_of(name: impl Into<String>, fields: Vec<FieldShape>) -> Self {
        let mut shape = Self::list(name, FieldType::Object);
        shape.fields = fields;
        shape
    }

    /// Set the remote field name
    #[must_use]
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Set the element type
    #[must_use]
    pub fn with_items(mut self, items: FieldType) -> Self {
        self.items = Some(items);
        self
    }

    /// Mark the field immutable after creation
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Override the explicit-null representation
    #[must_use]
    pub fn empty(mut self, value: impl Into<JsonValue>) -> Self {
        self.empty = Some(value.into());
        self
    }

    /// Name of the field in remote snapshots and payloads
    pub fn remote_name(&self) -> &str {
        self.remote.as_deref().unwrap_or(&self.name)
    }

    /// Element type, defaulting to string
    pub fn item_type(&self) -> FieldType {
        self.items.unwrap_or_default()
    }

    /// Canonical value for an explicit null
    pub fn empty_value(&self) -> JsonValue {
        if let Some(empty) = &self.empty {
            return empty.clone();
        }
        empty_for(self.field_type)
    }

    fn validate(&self, path: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config(format!("field name at '{path}' cannot be empty")));
        }

        let path = join_path(path, &self.name);
        let nested = self.field_type == FieldType::Object
            || (self.field_type.is_collection() && self.item_type() == FieldType::Object);

        if nested {
            validate_fields(&self.fields, &path)?;
        } else if !self.fields.is_empty() {
            return Err(Error::config(format!(
                "field '{path}' of type {} cannot declare nested fields",
                self.field_type
            )));
        }

        if self.items.is_some() && !self.field_type.is_collection() {
            return Err(Error::config(format!(
                "field '{path}' of type {} cannot declare items",
                self.field_type
            )));
        }

        if matches!(self.item_type(), FieldType::List | FieldType::Set | FieldType::Map)
            && self.field_type.is_collection()
        {
            return Err(Error::config(format!(
                "field '{path}' cannot nest collections directly; wrap them in an object"
            )));
        }

        // an explicit null must project to a value that projects to itself
        if let Some(empty) = &self.empty {
            match project_field_value(self, empty, &path) {
                Ok(canonical) if &canonical == empty => {}
                Ok(canonical) => {
                    return Err(Error::config(format!(
                        "field '{path}' empty value {empty} is not canonical for type {}; \
                         use {canonical}",
                        self.field_type
                    )));
                }
                Err(_) => {
                    return Err(Error::config(format!(
                        "field '{path}' empty value {empty} does not fit type {}",
                        self.field_type
                    )));
                }
            }
        }

        Ok(())
    }
}

pub(crate) fn empty_for(field_type: FieldType) -> JsonValue {
    match field_type {
        FieldType::String => JsonValue::String(String::new()),
        FieldType::Integer => JsonValue::from(0),
        FieldType::Float => JsonValue::from(0.0),
        FieldType::Bool => JsonValue::Bool(false),
        FieldType::List | FieldType::Set => JsonValue::Array(Vec::new()),
        FieldType::Map | FieldType::Object => JsonValue::Object(JsonObject::new()),
    }
}

pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn validate_fields(fields: &[FieldShape], path: &str) -> Result<()> {
    let mut names = HashSet::new();
    let mut remotes = HashSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(Error::config(format!(
                "duplicate field '{}'",
                join_path(path, &field.name)
            )));
        }
        if !remotes.insert(field.remote_name()) {
            return Err(Error::config(format!(
                "duplicate remote field '{}' under '{}'",
                field.remote_name(),
                if path.is_empty() { "$" } else { path }
            )));
        }
        field.validate(path)?;
    }
    Ok(())
}

/// Declared fields of a resource's canonical record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordShape {
    fields: Vec<FieldShape>,
}

impl RecordShape {
    /// Create a shape from field declarations
    pub fn new(fields: Vec<FieldShape>) -> Self {
        Self { fields }
    }

    /// All top-level fields
    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    /// Look up a top-level field by local name
    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Top-level fields the remote API will not change after creation
    pub fn immutable_fields(&self) -> impl Iterator<Item = &FieldShape> {
        self.fields.iter().filter(|f| f.immutable)
    }

    /// Check names are unique and nested declarations are consistent
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.fields, "")
    }
}

// ============================================================================
// Canonical Record
// ============================================================================

/// Local record keyed by canonical field name, in sorted key order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalRecord(JsonObject);

impl CanonicalRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(object) => Ok(Self(object)),
            other => Err(Error::invalid_request(format!(
                "record must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Set a field
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Get a field
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// Get a field as a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(JsonValue::as_str)
    }

    /// Whether the field is present
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Field names in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Convert into a JSON value
    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }

    /// Deterministic JSON text of the record
    pub fn to_json_string(&self) -> String {
        // a map of JSON values always serializes
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}
