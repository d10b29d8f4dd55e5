//! Dynamic record engine: insert, query, update, delete, and schema
//! reconciliation over encoded record payloads.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::{params, Transaction};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::codec::{self, FieldMap};
use crate::error::DbError;
use crate::lookup;
use crate::model::{now_millis, RESERVED_FIELD};
use crate::types::FieldType;

/// Key carrying a record's ordinal position in query results.
///
/// Recomputed on every listing; it is a positional handle, not a stored
/// identifier.
pub const POSITION_KEY: &str = "__position";

/// How a record (or set of records) is addressed for update and delete.
#[derive(Debug, Clone)]
pub enum RecordAddress {
    /// Ordinal index into the current listing order of the collection
    Position(usize),
    /// Key/value pairs every match must carry, compared by text form
    Filter(FieldMap),
}

/// Engine over the catalog's record rows.
#[derive(Debug, Clone)]
pub struct RecordEngine {
    catalog: Arc<Catalog>,
}

impl RecordEngine {
    /// Creates an engine over the given catalog.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Inserts one record.
    ///
    /// Any "id" key is dropped regardless of case. Every remaining key
    /// must name a declared field and every value must satisfy the
    /// declared type, or the whole insert fails with nothing written.
    /// Accepted values are coerced to canonical form before encoding.
    pub fn insert(
        &self,
        database: &str,
        collection: &str,
        values: &FieldMap,
    ) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let declared: HashMap<String, FieldType> = lookup::declared_fields(tx, coll.id)?
                .into_iter()
                .map(|f| (f.name, f.field_type))
                .collect();

            let accepted: Vec<(&String, &Value)> = values
                .iter()
                .filter(|(key, _)| !key.eq_ignore_ascii_case(RESERVED_FIELD))
                .collect();

            let undeclared: Vec<String> = accepted
                .iter()
                .filter(|(key, _)| !declared.contains_key(*key))
                .map(|(key, _)| (*key).clone())
                .collect();
            if !undeclared.is_empty() {
                return Err(DbError::UndeclaredFields {
                    collection: collection.to_string(),
                    keys: undeclared,
                });
            }

            let mut payload = FieldMap::new();
            for (key, value) in accepted {
                let field_type = declared[key];
                payload.insert(key.clone(), field_type.coerce(key, value)?);
            }

            let encoded = codec::encode(&payload)?;
            tx.execute(
                "INSERT INTO records (collection_id, field_values, created_at, last_modified)
                 VALUES (?1, ?2, ?3, ?3)",
                params![coll.id, encoded, now_millis()],
            )?;
            tracing::debug!("inserted record into {}.{}", database, collection);
            Ok(())
        })
    }

    /// Queries a collection.
    ///
    /// Each result carries [`POSITION_KEY`] plus every currently declared
    /// field: the decoded value when present (explicit null preserved),
    /// null when absent. The reserved "id" key is never surfaced. Records
    /// whose payload cannot be decoded are logged and skipped but still
    /// consume their position.
    ///
    /// With a filter, a record is included only when every filter key
    /// exists in the constructed result and matches by text form.
    pub fn query(
        &self,
        database: &str,
        collection: &str,
        filter: Option<&FieldMap>,
    ) -> Result<Vec<FieldMap>, DbError> {
        self.catalog.with_read(|conn| {
            let (_, coll) = lookup::require_collection(conn, database, collection)?;
            let declared = lookup::declared_fields(conn, coll.id)?;
            let records = lookup::collection_records(conn, coll.id)?;

            let mut results = Vec::new();
            for (index, record) in records.iter().enumerate() {
                let values = match codec::decode(&record.field_values) {
                    Ok(values) => values,
                    Err(e) => {
                        tracing::warn!("skipping undecodable record {}: {}", record.id, e);
                        continue;
                    }
                };
                let mut row = FieldMap::new();
                row.insert(POSITION_KEY.to_string(), Value::from(index as i64));
                for field in &declared {
                    if field.name.eq_ignore_ascii_case(RESERVED_FIELD) {
                        continue;
                    }
                    let value = values.get(&field.name).cloned().unwrap_or(Value::Null);
                    row.insert(field.name.clone(), value);
                }
                if let Some(filter) = filter {
                    if !codec::matches_filter(&row, filter) {
                        continue;
                    }
                }
                results.push(row);
            }
            Ok(results)
        })
    }

    /// Updates records by position or filter.
    ///
    /// Positional mode merges `values` into the addressed record's
    /// payload without re-validating types; an out-of-range position
    /// fails without touching anything. Filter mode updates every record
    /// whose payload matches and requires at least one match.
    ///
    /// # Returns
    /// The number of records updated.
    pub fn update(
        &self,
        database: &str,
        collection: &str,
        address: &RecordAddress,
        values: &FieldMap,
    ) -> Result<usize, DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let records = lookup::collection_records(tx, coll.id)?;
            if records.is_empty() {
                return Err(DbError::NoRecords(collection.to_string()));
            }
            match address {
                RecordAddress::Position(position) => {
                    let record =
                        records
                            .get(*position)
                            .ok_or_else(|| DbError::PositionOutOfRange {
                                position: *position,
                                len: records.len(),
                            })?;
                    let mut payload = codec::decode(&record.field_values)?;
                    merge_values(&mut payload, values);
                    write_payload(tx, record.id, &payload)?;
                    tracing::debug!("updated record at position {}", position);
                    Ok(1)
                }
                RecordAddress::Filter(filter) => {
                    if filter.is_empty() {
                        return Err(DbError::MissingAddress);
                    }
                    let mut updated = 0;
                    for record in &records {
                        let mut payload = match codec::decode(&record.field_values) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::warn!("skipping undecodable record {}: {}", record.id, e);
                                continue;
                            }
                        };
                        if !codec::matches_filter(&payload, filter) {
                            continue;
                        }
                        merge_values(&mut payload, values);
                        write_payload(tx, record.id, &payload)?;
                        updated += 1;
                    }
                    if updated == 0 {
                        return Err(DbError::NoMatches);
                    }
                    tracing::debug!("updated {} records by filter", updated);
                    Ok(updated)
                }
            }
        })
    }

    /// Deletes records by position or filter.
    ///
    /// Positional mode removes exactly one record; filter mode removes
    /// every match and requires at least one.
    ///
    /// # Returns
    /// The number of records deleted.
    pub fn delete(
        &self,
        database: &str,
        collection: &str,
        address: &RecordAddress,
    ) -> Result<usize, DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let records = lookup::collection_records(tx, coll.id)?;
            if records.is_empty() {
                return Err(DbError::NoRecords(collection.to_string()));
            }
            match address {
                RecordAddress::Position(position) => {
                    let record =
                        records
                            .get(*position)
                            .ok_or_else(|| DbError::PositionOutOfRange {
                                position: *position,
                                len: records.len(),
                            })?;
                    tx.execute("DELETE FROM records WHERE id = ?1", [record.id])?;
                    tracing::debug!("deleted record at position {}", position);
                    Ok(1)
                }
                RecordAddress::Filter(filter) => {
                    if filter.is_empty() {
                        return Err(DbError::MissingAddress);
                    }
                    let mut deleted = 0;
                    for record in &records {
                        let payload = match codec::decode(&record.field_values) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::warn!("skipping undecodable record {}: {}", record.id, e);
                                continue;
                            }
                        };
                        if !codec::matches_filter(&payload, filter) {
                            continue;
                        }
                        tx.execute("DELETE FROM records WHERE id = ?1", [record.id])?;
                        deleted += 1;
                    }
                    if deleted == 0 {
                        return Err(DbError::NoMatches);
                    }
                    tracing::debug!("deleted {} records by filter", deleted);
                    Ok(deleted)
                }
            }
        })
    }

    /// Reconciles every record payload with the declared field set:
    /// declared fields missing from a payload are inserted as explicit
    /// nulls, keys that are neither declared nor reserved are removed.
    /// Only modified records are persisted. Running it twice changes
    /// nothing the second time.
    pub fn sync_fields(&self, database: &str, collection: &str) -> Result<(), DbError> {
        self.catalog.with_write(|tx| {
            let (_, coll) = lookup::require_collection(tx, database, collection)?;
            let declared: Vec<String> = lookup::declared_fields(tx, coll.id)?
                .into_iter()
                .map(|f| f.name)
                .collect();
            let records = lookup::collection_records(tx, coll.id)?;
            let total = records.len();
            let mut failed = 0;

            for record in &records {
                let mut payload = match codec::decode(&record.field_values) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("cannot reconcile record {}: {}", record.id, e);
                        failed += 1;
                        continue;
                    }
                };
                let mut modified = false;
                for name in &declared {
                    if !payload.contains_key(name) {
                        payload.insert(name.clone(), Value::Null);
                        modified = true;
                    }
                }
                let stray: Vec<String> = payload
                    .keys()
                    .filter(|key| {
                        !key.eq_ignore_ascii_case(RESERVED_FIELD) && !declared.contains(key)
                    })
                    .cloned()
                    .collect();
                for key in stray {
                    payload.remove(&key);
                    modified = true;
                }
                if modified {
                    if let Err(e) = write_payload(tx, record.id, &payload) {
                        tracing::warn!("cannot persist reconciled record {}: {}", record.id, e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                return Err(DbError::PartialFailure { failed, total });
            }
            tracing::debug!("reconciled {} records in {}.{}", total, database, collection);
            Ok(())
        })
    }
}

/// Merges update values into a payload, overwriting existing keys.
fn merge_values(payload: &mut FieldMap, values: &FieldMap) {
    for (key, value) in values {
        payload.insert(key.clone(), value.clone());
    }
}

/// Persists a rewritten payload for one record.
pub(crate) fn write_payload(
    tx: &Transaction<'_>,
    record_id: i64,
    values: &FieldMap,
) -> Result<(), DbError> {
    let payload = codec::encode(values)?;
    tx.execute(
        "UPDATE records SET field_values = ?1, last_modified = ?2 WHERE id = ?3",
        params![payload, now_millis(), record_id],
    )?;
    Ok(())
}
