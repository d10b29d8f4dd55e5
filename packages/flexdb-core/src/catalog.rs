//! The shared metadata catalog: one SQLite file holding every database,
//! collection, field, and record row.
//!
//! Every public operation opens its own short-lived connection, runs one
//! transaction, and closes it again. Long-lived per-database handles are
//! the session's business, not the catalog's.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, Transaction};

use crate::config::StoreConfig;
use crate::error::DbError;

/// File name of the shared catalog inside the data directory.
pub const CATALOG_FILE: &str = "catalog.db";

/// Physical schema of the catalog. Dynamic field values are not columns;
/// they live in `records.field_values` as encoded text.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS databases (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    created_at    INTEGER NOT NULL,
    last_modified INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS collections (
    id            INTEGER PRIMARY KEY,
    database_id   INTEGER NOT NULL,
    name          TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    last_modified INTEGER NOT NULL,
    UNIQUE (database_id, name)
);
CREATE TABLE IF NOT EXISTS fields (
    id            INTEGER PRIMARY KEY,
    collection_id INTEGER NOT NULL,
    name          TEXT NOT NULL,
    field_type    TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    last_modified INTEGER NOT NULL,
    UNIQUE (collection_id, name)
);
CREATE TABLE IF NOT EXISTS records (
    id            INTEGER PRIMARY KEY,
    collection_id INTEGER NOT NULL,
    field_values  TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    last_modified INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_collections_database ON collections (database_id);
CREATE INDEX IF NOT EXISTS idx_fields_collection ON fields (collection_id);
CREATE INDEX IF NOT EXISTS idx_records_collection ON records (collection_id);
";

/// Handle to the shared catalog file.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Path of the catalog file
    path: PathBuf,
    /// Busy timeout applied to every connection
    busy_timeout: Duration,
}

impl Catalog {
    /// Opens (and bootstraps, if needed) the catalog under the configured
    /// data directory.
    ///
    /// # Returns
    /// `Result<Catalog, DbError>` with the ready-to-use handle.
    pub fn open(config: &StoreConfig) -> Result<Self, DbError> {
        fs::create_dir_all(&config.data_dir)?;
        let catalog = Self {
            path: config.data_dir.join(CATALOG_FILE),
            busy_timeout: config.busy_timeout(),
        };
        let conn = catalog.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(catalog)
    }

    /// Opens a fresh connection to the catalog file.
    fn connect(&self) -> Result<Connection, DbError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Runs a read-only operation on its own short-lived connection.
    pub fn with_read<T, F>(&self, op: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self.connect()?;
        op(&conn)
    }

    /// Runs a write operation inside one transaction on its own
    /// short-lived connection.
    ///
    /// The transaction commits when the operation returns `Ok` and rolls
    /// back when it returns `Err`.
    pub fn with_write<T, F>(&self, op: F) -> Result<T, DbError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, DbError>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let out = op(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}
