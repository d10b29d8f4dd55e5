//! Schema registry: CRUD for databases, collections, and declared fields.
//!
//! Cascading deletes run inside one transaction but treat each dependent
//! as best-effort: a failed dependent is logged and skipped, the rest of
//! the cascade continues.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use rusqlite::{params, Transaction};

use crate::catalog::Catalog;
use crate::codec;
use crate::config::StoreConfig;
use crate::error::DbError;
use crate::lookup;
use crate::model::{now_millis, CollectionMeta, RESERVED_FIELD};
use crate::records::write_payload;
use crate::types::FieldType;

/// Registry over the catalog's database/collection/field metadata.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    catalog: Arc<Catalog>,
    config: StoreConfig,
}

impl SchemaRegistry {
    /// Creates a registry over the given catalog.
    pub fn new(catalog: Arc<Catalog>, config: StoreConfig) -> Self {
        Self { catalog, config }
    }

    // ----- databases -----

    /// Creates a database entry. Names are unique without case folding.
    pub fn create_database(&self, name: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            if lookup::find_database(tx, name)?.is_some() {
                return Err(DbError::DatabaseExists(name.to_string()));
            }
            let now = now_millis();
            tx.execute(
                "INSERT INTO databases (name, created_at, last_modified) VALUES (?1, ?2, ?2)",
                params![name, now],
            )?;
            tracing::debug!("created database {}", name);
            Ok(())
        })
    }

    /// Lists database names in ascending order.
    pub fn list_databases(&self) -> Result<Vec<String>, DbError> {
        self.catalog.with_read(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM databases ORDER BY name ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut names = Vec::new();
            for row in rows {
                names.push(row?);
            }
            Ok(names)
        })
    }

    /// Renames a database.
    ///
    /// Fails when the new name is taken or the old name does not exist.
    /// Callers tracking an open session on the old name are responsible
    /// for carrying the rename over to it.
    pub fn rename_database(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            if lookup::find_database(tx, new)?.is_some() {
                return Err(DbError::DatabaseExists(new.to_string()));
            }
            let db = lookup::find_database(tx, old)?
                .ok_or_else(|| DbError::DatabaseNotFound(old.to_string()))?;
            tx.execute(
                "UPDATE databases SET name = ?1, last_modified = ?2 WHERE id = ?3",
                params![new, now_millis(), db.id],
            )?;
            tracing::debug!("renamed database {} -> {}", old, new);
            Ok(())
        })
    }

    /// Deletes a database, cascading through its collections, fields, and
    /// records, then best-effort removes the physical database file and
    /// its sidecar artifacts.
    pub fn delete_database(&self, name: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let db = lookup::find_database(tx, name)?
                .ok_or_else(|| DbError::DatabaseNotFound(name.to_string()))?;
            let collections = lookup::collections_of(tx, db.id)?;
            tracing::debug!(
                "deleting database {} with {} collections",
                name,
                collections.len()
            );
            for coll in &collections {
                delete_collection_contents(tx, coll);
                if let Err(e) = tx.execute("DELETE FROM collections WHERE id = ?1", [coll.id]) {
                    tracing::warn!("failed to delete collection {}: {}", coll.name, e);
                }
            }
            tx.execute("DELETE FROM databases WHERE id = ?1", [db.id])?;
            Ok(())
        })?;
        self.remove_database_files(name);
        Ok(())
    }

    /// Best-effort removal of a logical database's physical artifacts.
    fn remove_database_files(&self, name: &str) {
        for path in self.config.database_artifacts(name) {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("failed to remove {}: {}", path.display(), e),
            }
        }
    }

    // ----- collections -----

    /// Creates a collection in a database.
    pub fn create_collection(&self, database: &str, name: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let db = lookup::find_database(tx, database)?
                .ok_or_else(|| DbError::DatabaseNotFound(database.to_string()))?;
            if lookup::find_collection(tx, db.id, name)?.is_some() {
                return Err(DbError::CollectionExists {
                    database: database.to_string(),
                    name: name.to_string(),
                });
            }
            let now = now_millis();
            tx.execute(
                "INSERT INTO collections (database_id, name, created_at, last_modified)
                 VALUES (?1, ?2, ?3, ?3)",
                params![db.id, name, now],
            )?;
            tracing::debug!("created collection {} in {}", name, database);
            Ok(())
        })
    }

    /// Lists collection names of a database in ascending order.
    pub fn list_collections(&self, database: &str) -> Result<Vec<String>, DbError> {
        self.catalog.with_read(|conn| {
            let db = lookup::find_database(conn, database)?
                .ok_or_else(|| DbError::DatabaseNotFound(database.to_string()))?;
            Ok(lookup::collections_of(conn, db.id)?
                .into_iter()
                .map(|c| c.name)
                .collect())
        })
    }

    /// Renames a collection within its database.
    pub fn rename_collection(&self, database: &str, old: &str, new: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let db = lookup::find_database(tx, database)?
                .ok_or_else(|| DbError::DatabaseNotFound(database.to_string()))?;
            if lookup::find_collection(tx, db.id, new)?.is_some() {
                return Err(DbError::CollectionExists {
                    database: database.to_string(),
                    name: new.to_string(),
                });
            }
            let coll = lookup::find_collection(tx, db.id, old)?.ok_or_else(|| {
                DbError::CollectionNotFound {
                    database: database.to_string(),
                    name: old.to_string(),
                }
            })?;
            tx.execute(
                "UPDATE collections SET name = ?1, last_modified = ?2 WHERE id = ?3",
                params![new, now_millis(), coll.id],
            )?;
            tracing::debug!("renamed collection {} -> {} in {}", old, new, database);
            Ok(())
        })
    }

    /// Deletes a collection, cascading through its fields and records.
    pub fn delete_collection(&self, database: &str, name: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, name)?;
            delete_collection_contents(tx, &coll);
            tx.execute("DELETE FROM collections WHERE id = ?1", [coll.id])?;
            tracing::debug!("deleted collection {} in {}", name, database);
            Ok(())
        })
    }

    // ----- fields -----

    /// Declares a field on a collection.
    ///
    /// The reserved name "id" is rejected in any case; the type tag is
    /// parsed case-insensitively and stored upper-case.
    pub fn create_field(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        type_tag: &str,
    ) -> Result<(), DbError> {
        if field.eq_ignore_ascii_case(RESERVED_FIELD) {
            return Err(DbError::ReservedFieldName(field.to_string()));
        }
        let field_type = FieldType::parse(type_tag)
            .ok_or_else(|| DbError::UnknownFieldType(type_tag.to_string()))?;
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            if lookup::find_field(tx, coll.id, field)?.is_some() {
                return Err(DbError::FieldExists {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
            insert_field(tx, coll.id, field, field_type)?;
            tracing::debug!(
                "created field {} ({}) on {}.{}",
                field,
                field_type,
                database,
                collection
            );
            Ok(())
        })
    }

    /// Lists a collection's fields as (name, type tag) pairs, declared
    /// fields first in name order.
    ///
    /// Also scans every stored record for keys that are neither declared
    /// nor reserved and eagerly declares each as a STRING field before
    /// returning it. Listing repairs schema drift, it is not read-only.
    pub fn list_fields(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<(String, String)>, DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let declared = lookup::declared_fields(tx, coll.id)?;
            let mut out: Vec<(String, String)> = declared
                .iter()
                .map(|f| (f.name.clone(), f.field_type.as_str().to_string()))
                .collect();

            // Collect payload keys that have no declared field yet.
            let mut undeclared = BTreeSet::new();
            for record in lookup::collection_records(tx, coll.id)? {
                let values = match codec::decode(&record.field_values) {
                    Ok(values) => values,
                    Err(e) => {
                        tracing::warn!("skipping undecodable record {}: {}", record.id, e);
                        continue;
                    }
                };
                for key in values.keys() {
                    if key.eq_ignore_ascii_case(RESERVED_FIELD) {
                        continue;
                    }
                    if !declared.iter().any(|f| &f.name == key) {
                        undeclared.insert(key.clone());
                    }
                }
            }

            for key in undeclared {
                insert_field(tx, coll.id, &key, FieldType::String)?;
                tracing::debug!("auto-declared field {} on {}.{}", key, database, collection);
                out.push((key, FieldType::String.as_str().to_string()));
            }
            Ok(out)
        })
    }

    /// Renames and/or retypes a field.
    ///
    /// A rename also rewrites the key inside every stored record payload;
    /// a record that cannot be rewritten is logged and skipped.
    pub fn update_field(
        &self,
        database: &str,
        collection: &str,
        old: &str,
        new: &str,
        type_tag: &str,
    ) -> Result<(), DbError> {
        if new.eq_ignore_ascii_case(RESERVED_FIELD) {
            return Err(DbError::ReservedFieldName(new.to_string()));
        }
        let field_type = FieldType::parse(type_tag)
            .ok_or_else(|| DbError::UnknownFieldType(type_tag.to_string()))?;
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            if old != new && lookup::find_field(tx, coll.id, new)?.is_some() {
                return Err(DbError::FieldExists {
                    collection: collection.to_string(),
                    field: new.to_string(),
                });
            }
            let field = lookup::find_field(tx, coll.id, old)?.ok_or_else(|| {
                DbError::FieldNotFound {
                    collection: collection.to_string(),
                    field: old.to_string(),
                }
            })?;
            tx.execute(
                "UPDATE fields SET name = ?1, field_type = ?2, last_modified = ?3 WHERE id = ?4",
                params![new, field_type.as_str(), now_millis(), field.id],
            )?;
            if old != new {
                rename_payload_key(tx, &coll, old, new);
            }
            tracing::debug!(
                "updated field {} -> {} ({}) on {}.{}",
                old,
                new,
                field_type,
                database,
                collection
            );
            Ok(())
        })
    }

    /// Deletes a field and strips its key from every stored record
    /// payload, keeping the records themselves.
    pub fn delete_field(
        &self,
        database: &str,
        collection: &str,
        field: &str,
    ) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let meta = lookup::find_field(tx, coll.id, field)?.ok_or_else(|| {
                DbError::FieldNotFound {
                    collection: collection.to_string(),
                    field: field.to_string(),
                }
            })?;
            tx.execute("DELETE FROM fields WHERE id = ?1", [meta.id])?;
            strip_payload_key(tx, &coll, field);
            tracing::debug!("deleted field {} on {}.{}", field, database, collection);
            Ok(())
        })
    }
}

/// Inserts a field row with fresh timestamps.
fn insert_field(
    tx: &Transaction<'_>,
    collection_id: i64,
    name: &str,
    field_type: FieldType,
) -> Result<(), DbError> {
    tx.execute(
        "INSERT INTO fields (collection_id, name, field_type, created_at, last_modified)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![collection_id, name, field_type.as_str(), now_millis()],
    )?;
    Ok(())
}

/// Deletes the records and fields of a collection, logging and skipping
/// failures rather than aborting the cascade.
fn delete_collection_contents(tx: &Transaction<'_>, coll: &CollectionMeta) {
    if let Err(e) = tx.execute("DELETE FROM records WHERE collection_id = ?1", [coll.id]) {
        tracing::warn!("failed to delete records of {}: {}", coll.name, e);
    }
    if let Err(e) = tx.execute("DELETE FROM fields WHERE collection_id = ?1", [coll.id]) {
        tracing::warn!("failed to delete fields of {}: {}", coll.name, e);
    }
}

/// Rewrites `old` to `new` inside every record payload of a collection,
/// best-effort per record.
fn rename_payload_key(tx: &Transaction<'_>, coll: &CollectionMeta, old: &str, new: &str) {
    let records = match lookup::collection_records(tx, coll.id) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("failed to load records of {}: {}", coll.name, e);
            return;
        }
    };
    for record in records {
        let result = codec::decode(&record.field_values).and_then(|mut values| {
            match values.remove(old) {
                Some(value) => {
                    values.insert(new.to_string(), value);
                    write_payload(tx, record.id, &values)
                }
                None => Ok(()),
            }
        });
        if let Err(e) = result {
            tracing::warn!("failed to rename key in record {}: {}", record.id, e);
        }
    }
}

/// Removes `key` from every record payload of a collection, best-effort
/// per record.
fn strip_payload_key(tx: &Transaction<'_>, coll: &CollectionMeta, key: &str) {
    let records = match lookup::collection_records(tx, coll.id) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("failed to load records of {}: {}", coll.name, e);
            return;
        }
    };
    for record in records {
        let result = codec::decode(&record.field_values).and_then(|mut values| {
            if values.remove(key).is_some() {
                write_payload(tx, record.id, &values)
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            tracing::warn!("failed to strip key from record {}: {}", record.id, e);
        }
    }
}
