//! Row lookups shared by the schema registry and the record engine.

use rusqlite::{Connection, OptionalExtension};

use crate::error::DbError;
use crate::model::{CollectionMeta, DatabaseMeta, DynamicRecord, FieldMeta};
use crate::types::FieldType;

pub(crate) fn find_database(
    conn: &Connection,
    name: &str,
) -> Result<Option<DatabaseMeta>, DbError> {
    conn.query_row(
        "SELECT id, name, created_at, last_modified FROM databases WHERE name = ?1",
        [name],
        |row| {
            Ok(DatabaseMeta {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                last_modified: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DbError::from)
}

pub(crate) fn find_collection(
    conn: &Connection,
    database_id: i64,
    name: &str,
) -> Result<Option<CollectionMeta>, DbError> {
    conn.query_row(
        "SELECT id, database_id, name, created_at, last_modified
         FROM collections WHERE database_id = ?1 AND name = ?2",
        rusqlite::params![database_id, name],
        |row| {
            Ok(CollectionMeta {
                id: row.get(0)?,
                database_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
                last_modified: row.get(4)?,
            })
        },
    )
    .optional()
    .map_err(DbError::from)
}

pub(crate) fn find_field(
    conn: &Connection,
    collection_id: i64,
    name: &str,
) -> Result<Option<FieldMeta>, DbError> {
    let row = conn
        .query_row(
            "SELECT id, collection_id, name, field_type, created_at, last_modified
             FROM fields WHERE collection_id = ?1 AND name = ?2",
            rusqlite::params![collection_id, name],
            field_tuple,
        )
        .optional()?;
    row.map(field_from_tuple).transpose()
}

/// Resolves a database and one of its collections, failing with the
/// matching not-found error.
pub(crate) fn require_collection(
    conn: &Connection,
    database: &str,
    collection: &str,
) -> Result<(DatabaseMeta, CollectionMeta), DbError> {
    let db = find_database(conn, database)?
        .ok_or_else(|| DbError::DatabaseNotFound(database.to_string()))?;
    let coll = find_collection(conn, db.id, collection)?.ok_or_else(|| {
        DbError::CollectionNotFound {
            database: database.to_string(),
            name: collection.to_string(),
        }
    })?;
    Ok((db, coll))
}

/// Collections of a database, ordered by name.
pub(crate) fn collections_of(
    conn: &Connection,
    database_id: i64,
) -> Result<Vec<CollectionMeta>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, database_id, name, created_at, last_modified
         FROM collections WHERE database_id = ?1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([database_id], |row| {
        Ok(CollectionMeta {
            id: row.get(0)?,
            database_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            last_modified: row.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Declared fields of a collection, ordered by name.
pub(crate) fn declared_fields(
    conn: &Connection,
    collection_id: i64,
) -> Result<Vec<FieldMeta>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, collection_id, name, field_type, created_at, last_modified
         FROM fields WHERE collection_id = ?1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([collection_id], field_tuple)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(field_from_tuple(row?)?);
    }
    Ok(out)
}

/// Records of a collection in listing order (primary key ascending).
///
/// This order is what positional addressing indexes into; it must stay
/// identical across query, update, and delete.
pub(crate) fn collection_records(
    conn: &Connection,
    collection_id: i64,
) -> Result<Vec<DynamicRecord>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, collection_id, field_values, created_at, last_modified
         FROM records WHERE collection_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([collection_id], |row| {
        Ok(DynamicRecord {
            id: row.get(0)?,
            collection_id: row.get(1)?,
            field_values: row.get(2)?,
            created_at: row.get(3)?,
            last_modified: row.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

type FieldTuple = (i64, i64, String, String, i64, i64);

fn field_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<FieldTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn field_from_tuple(tuple: FieldTuple) -> Result<FieldMeta, DbError> {
    let (id, collection_id, name, tag, created_at, last_modified) = tuple;
    let field_type = FieldType::parse(&tag).ok_or(DbError::UnknownFieldType(tag))?;
    Ok(FieldMeta {
        id,
        collection_id,
        name,
        field_type,
        created_at,
        last_modified,
    })
}
