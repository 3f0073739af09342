//! Snapshot normalization: raw feed documents into [`CanonicalRecord`]s.

use serde_json::Value;

use crate::{
    error::{ReplicaError, Result},
    types::{CanonicalRecord, Fields, RawDocument},
};

/// Normalize `raw` into a [`CanonicalRecord`], merging the document id into
/// the field map under `id_field`.
///
/// The data object is shallow-copied; `raw` is never mutated. An `id` key in
/// the data is overwritten by the document id.
pub fn normalize(raw: &RawDocument, id_field: &str) -> Result<CanonicalRecord, ReplicaError> {
    let id = document_id(raw)?;
    let mut fields = normalize_fields(raw)?;
    fields.insert(id_field.to_string(), Value::String(id.to_string()));
    Ok(CanonicalRecord {
        id: id.to_string(),
        fields,
    })
}

/// Copy of the document's data object, without the id merge.
pub fn normalize_fields(raw: &RawDocument) -> Result<Fields, ReplicaError> {
    match &raw.data {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(ReplicaError::malformed(format!(
            "document data must be an object, got {}",
            kind_of(other)
        ))),
        None => Err(ReplicaError::malformed("document has no data")),
    }
}

/// The non-empty document id of `raw`.
pub fn document_id(raw: &RawDocument) -> Result<&str, ReplicaError> {
    match raw.id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        Some(_) => Err(ReplicaError::malformed("document id is empty")),
        None => Err(ReplicaError::malformed("document has no id")),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
