//! Data layer error types.

use thiserror::Error;

/// Errors produced by catalog, schema, record, and session operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Database not found by name
    #[error("database '{0}' not found")]
    DatabaseNotFound(String),

    /// Database name collision
    #[error("database '{0}' already exists")]
    DatabaseExists(String),

    /// Collection not found within a database
    #[error("collection '{name}' not found in database '{database}'")]
    CollectionNotFound { database: String, name: String },

    /// Collection name collision within a database
    #[error("collection '{name}' already exists in database '{database}'")]
    CollectionExists { database: String, name: String },

    /// Field not found within a collection
    #[error("field '{field}' not found in collection '{collection}'")]
    FieldNotFound { collection: String, field: String },

    /// Field name collision within a collection
    #[error("field '{field}' already exists in collection '{collection}'")]
    FieldExists { collection: String, field: String },

    /// Field name is reserved for internal use
    #[error("field name '{0}' is reserved")]
    ReservedFieldName(String),

    /// Field type tag outside the supported set
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    /// Insert carried keys with no declared field
    #[error("keys not declared as fields in collection '{collection}': {keys:?}")]
    UndeclaredFields { collection: String, keys: Vec<String> },

    /// Value does not satisfy the declared field type
    #[error("value for field '{field}' is not a valid {expected}: {value}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        value: String,
    },

    /// Stored record payload is not a JSON object
    #[error("record payload is not a JSON object")]
    PayloadNotObject,

    /// Positional address outside the current record listing
    #[error("position {position} out of range for {len} records")]
    PositionOutOfRange { position: usize, len: usize },

    /// Filter address matched no record
    #[error("no records matched the filter")]
    NoMatches,

    /// Collection holds no records to address
    #[error("collection '{0}' has no records")]
    NoRecords(String),

    /// Neither a position nor a usable filter was given
    #[error("either a position or a non-empty filter is required")]
    MissingAddress,

    /// Some records in a bulk pass could not be processed
    #[error("{failed} of {total} records could not be processed")]
    PartialFailure { failed: usize, total: usize },

    /// Session mutex poisoned by a panicked holder
    #[error("session lock poisoned")]
    LockPoisoned,

    /// Underlying SQLite failure
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Payload encode/decode failure
    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Filesystem failure around the data directory
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
