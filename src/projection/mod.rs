//! State projection module
//!
//! Converts sparse remote snapshots into canonical local records.
//!
//! # Overview
//!
//! A remote field is in one of three slots:
//!
//! | Slot           | JSON form        | Canonical record            |
//! |----------------|------------------|-----------------------------|
//! | `Present(v)`   | `"field": v`     | projected `v`               |
//! | `ExplicitNull` | `"field": null`  | the field's empty value     |
//! | `Absent`       | key missing      | omitted                     |
//!
//! Lists keep remote order, sets are deduplicated and sorted, and records
//! are backed by sorted maps, so projecting the same snapshot twice yields
//! byte-identical output.

mod projector;
mod types;

pub use projector::{changed_fields, diff, project, FieldChange, StateProjector};
pub use types::{CanonicalRecord, FieldShape, FieldType, RecordShape, RemoteAttributeSet, Slot};

#[cfg(test)]
mod tests;
