//! Catalog row types shared across the data layer.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::FieldType;

/// Key name reserved for internal identifiers; never declared as a field
/// and never surfaced in query results.
pub const RESERVED_FIELD: &str = "id";

/// Metadata row for a logical database.
#[derive(Debug, Clone)]
pub struct DatabaseMeta {
    /// Row identifier
    pub id: i64,
    /// User-facing database name, unique across the catalog
    pub name: String,
    /// Creation timestamp, milliseconds since the Unix epoch
    pub created_at: i64,
    /// Last mutation timestamp, milliseconds since the Unix epoch
    pub last_modified: i64,
}

/// Metadata row for a collection owned by a database.
#[derive(Debug, Clone)]
pub struct CollectionMeta {
    /// Row identifier
    pub id: i64,
    /// Owning database row
    pub database_id: i64,
    /// Collection name, unique per database
    pub name: String,
    /// Creation timestamp
    pub created_at: i64,
    /// Last mutation timestamp
    pub last_modified: i64,
}

/// Metadata row for a declared field owned by a collection.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    /// Row identifier
    pub id: i64,
    /// Owning collection row
    pub collection_id: i64,
    /// Field name, unique per collection
    pub name: String,
    /// Declared value type
    pub field_type: FieldType,
    /// Creation timestamp
    pub created_at: i64,
    /// Last mutation timestamp
    pub last_modified: i64,
}

/// Stored record row; field values are one encoded JSON object.
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    /// Row identifier
    pub id: i64,
    /// Owning collection row
    pub collection_id: i64,
    /// Encoded key/value payload
    pub field_values: String,
    /// Creation timestamp
    pub created_at: i64,
    /// Last mutation timestamp
    pub last_modified: i64,
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
