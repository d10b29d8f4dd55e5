//! Closed field type set and per-type value coercion.

use std::fmt;

use serde_json::Value;

use crate::error::DbError;

/// Declared value type of a field.
///
/// Tags are parsed case-insensitively and stored as upper-case strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Any string value
    String,
    /// Integral number, or a string parseable as one
    Integer,
    /// Floating number, or a string parseable as one
    Double,
    /// Boolean, or the strings "true"/"false" in any case
    Boolean,
    /// Free-form string, object, or array payload
    Json,
}

impl FieldType {
    /// All supported field types.
    pub const ALL: [FieldType; 5] = [
        FieldType::String,
        FieldType::Integer,
        FieldType::Double,
        FieldType::Boolean,
        FieldType::Json,
    ];

    /// Parses a type tag, ignoring case.
    ///
    /// # Returns
    /// `Some(FieldType)` for a supported tag, `None` otherwise.
    pub fn parse(tag: &str) -> Option<FieldType> {
        match tag.to_ascii_uppercase().as_str() {
            "STRING" => Some(FieldType::String),
            "INTEGER" => Some(FieldType::Integer),
            "DOUBLE" => Some(FieldType::Double),
            "BOOLEAN" => Some(FieldType::Boolean),
            "JSON" => Some(FieldType::Json),
            _ => None,
        }
    }

    /// Returns the canonical upper-case tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Double => "DOUBLE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Json => "JSON",
        }
    }

    /// Validates a value against this type and returns its canonical form.
    ///
    /// Strings carrying numeric or boolean text are converted to the
    /// corresponding JSON number/boolean; everything else must already
    /// have the declared shape.
    ///
    /// # Arguments
    /// * `field` - Field name, used for error reporting
    /// * `value` - Incoming value
    ///
    /// # Returns
    /// The coerced value, or `DbError::TypeMismatch`.
    pub fn coerce(self, field: &str, value: &Value) -> Result<Value, DbError> {
        let mismatch = || DbError::TypeMismatch {
            field: field.to_string(),
            expected: self.as_str(),
            value: value.to_string(),
        };

        match self {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
                Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            FieldType::Double => match value {
                Value::Number(n) => n
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(mismatch),
                Value::String(s) => s
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(mismatch()),
                },
                _ => Err(mismatch()),
            },
            FieldType::Json => match value {
                Value::String(_) | Value::Object(_) | Value::Array(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
