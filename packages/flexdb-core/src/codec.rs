//! Codec for the encoded key/value payload stored with each record.
//!
//! The embedded store has a fixed physical schema, so dynamic field
//! values travel as one JSON object serialized to text. All parse and
//! serialize logic lives here so the rest of the layer never touches the
//! raw payload text.

use serde_json::Value;

use crate::error::DbError;

/// Decoded payload of a record: field name → value.
pub type FieldMap = serde_json::Map<String, Value>;

/// Decodes a stored payload into a field map.
///
/// A blank payload decodes to an empty map; any other non-object payload
/// is rejected.
pub fn decode(payload: &str) -> Result<FieldMap, DbError> {
    if payload.trim().is_empty() {
        return Ok(FieldMap::new());
    }
    match serde_json::from_str::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        _ => Err(DbError::PayloadNotObject),
    }
}

/// Encodes a field map back into payload text.
pub fn encode(values: &FieldMap) -> Result<String, DbError> {
    Ok(serde_json::to_string(values)?)
}

/// Canonical text form of a value, used by equality filters.
///
/// Strings compare by their raw content; every other value compares by
/// its JSON rendering.
pub fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Returns true when every filter pair is present in `values` with a
/// matching text form.
pub fn matches_filter(values: &FieldMap, filter: &FieldMap) -> bool {
    filter
        .iter()
        .all(|(key, expected)| {
            values
                .get(key)
                .is_some_and(|actual| text_form(actual) == text_form(expected))
        })
}
