//! Facade dispatching data layer operations to the blocking pool.

use std::sync::{Arc, Mutex};

use tokio::task;

use flexdb_core::{
    Catalog, DbError, FieldMap, RecordAddress, RecordEngine, SchemaRegistry, Session, StoreConfig,
};

/// Async front door to the store, consumed by the presentation layer.
///
/// Operations report success as a boolean (or an empty collection);
/// failure detail goes to the log only. The session holding the selected
/// database is owned here and never consulted by metadata operations.
#[derive(Clone)]
pub struct StoreManager {
    registry: Arc<SchemaRegistry>,
    engine: Arc<RecordEngine>,
    session: Arc<Mutex<Session>>,
}

impl StoreManager {
    /// Opens the store under the configured data directory, bootstrapping
    /// the catalog when missing.
    pub fn open(config: StoreConfig) -> Result<Self, DbError> {
        let catalog = Arc::new(Catalog::open(&config)?);
        Ok(Self {
            registry: Arc::new(SchemaRegistry::new(Arc::clone(&catalog), config.clone())),
            engine: Arc::new(RecordEngine::new(catalog)),
            session: Arc::new(Mutex::new(Session::new(config))),
        })
    }

    /// Runs a blocking operation on the blocking pool, logging any error.
    async fn run<T, F>(what: &'static str, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DbError> + Send + 'static,
    {
        match task::spawn_blocking(op).await {
            Ok(Ok(out)) => Some(out),
            Ok(Err(e)) => {
                tracing::error!("{} failed: {}", what, e);
                None
            }
            Err(e) => {
                tracing::error!("{} task failed: {}", what, e);
                None
            }
        }
    }

    // ----- databases -----

    /// Creates a database. False when the name is taken.
    pub async fn create_database(&self, name: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let name = name.to_owned();
        Self::run("create database", move || registry.create_database(&name))
            .await
            .is_some()
    }

    /// Lists database names, ascending. Empty on failure.
    pub async fn list_databases(&self) -> Vec<String> {
        let registry = Arc::clone(&self.registry);
        Self::run("list databases", move || registry.list_databases())
            .await
            .unwrap_or_default()
    }

    /// Opens a database as the session's selected database.
    pub async fn open_database(&self, name: &str) -> bool {
        let session = Arc::clone(&self.session);
        let name = name.to_owned();
        Self::run("open database", move || {
            let mut session = session.lock().map_err(|_| DbError::LockPoisoned)?;
            session.open(&name)
        })
        .await
        .is_some()
    }

    /// Renames a database and carries the rename over to the session
    /// when it currently points at the old name.
    pub async fn rename_database(&self, old: &str, new: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let session = Arc::clone(&self.session);
        let old = old.to_owned();
        let new = new.to_owned();
        Self::run("rename database", move || {
            registry.rename_database(&old, &new)?;
            let mut session = session.lock().map_err(|_| DbError::LockPoisoned)?;
            if session.active_name() == Some(old.as_str()) {
                session.rename_active(&new);
            }
            Ok(())
        })
        .await
        .is_some()
    }

    /// Deletes a database and everything it owns, closing the session
    /// first when it points at this database.
    pub async fn delete_database(&self, name: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let session = Arc::clone(&self.session);
        let name = name.to_owned();
        Self::run("delete database", move || {
            {
                let mut session = session.lock().map_err(|_| DbError::LockPoisoned)?;
                if session.active_name() == Some(name.as_str()) {
                    session.close();
                }
            }
            registry.delete_database(&name)
        })
        .await
        .is_some()
    }

    /// Closes the session's selected database, if any.
    pub async fn close_database(&self) {
        let session = Arc::clone(&self.session);
        Self::run("close database", move || {
            let mut session = session.lock().map_err(|_| DbError::LockPoisoned)?;
            session.close();
            Ok(())
        })
        .await;
    }

    /// Recovery action: closes the selected database, waits briefly, and
    /// reopens it. True when nothing was open.
    pub async fn reset_connection(&self) -> bool {
        let session = Arc::clone(&self.session);
        Self::run("reset connection", move || {
            let mut session = session.lock().map_err(|_| DbError::LockPoisoned)?;
            session.reset()
        })
        .await
        .is_some()
    }

    /// Name of the session's selected database, if any.
    pub fn current_database(&self) -> Option<String> {
        match self.session.lock() {
            Ok(session) => session.active_name().map(str::to_string),
            Err(_) => {
                tracing::error!("session lock poisoned");
                None
            }
        }
    }

    // ----- collections -----

    /// Creates a collection in a database.
    pub async fn create_collection(&self, database: &str, name: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let name = name.to_owned();
        Self::run("create collection", move || {
            registry.create_collection(&database, &name)
        })
        .await
        .is_some()
    }

    /// Lists collection names, ascending. Empty when the database is
    /// missing or on failure.
    pub async fn list_collections(&self, database: &str) -> Vec<String> {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        Self::run("list collections", move || {
            registry.list_collections(&database)
        })
        .await
        .unwrap_or_default()
    }

    /// Renames a collection within a database.
    pub async fn rename_collection(&self, database: &str, old: &str, new: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let old = old.to_owned();
        let new = new.to_owned();
        Self::run("rename collection", move || {
            registry.rename_collection(&database, &old, &new)
        })
        .await
        .is_some()
    }

    /// Deletes a collection and everything it owns.
    pub async fn delete_collection(&self, database: &str, name: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let name = name.to_owned();
        Self::run("delete collection", move || {
            registry.delete_collection(&database, &name)
        })
        .await
        .is_some()
    }

    // ----- fields -----

    /// Declares a field on a collection.
    pub async fn create_field(
        &self,
        database: &str,
        collection: &str,
        name: &str,
        field_type: &str,
    ) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let collection = collection.to_owned();
        let name = name.to_owned();
        let field_type = field_type.to_owned();
        Self::run("create field", move || {
            registry.create_field(&database, &collection, &name, &field_type)
        })
        .await
        .is_some()
    }

    /// Lists a collection's fields as (name, type tag) pairs. Empty on
    /// failure.
    pub async fn list_fields(&self, database: &str, collection: &str) -> Vec<(String, String)> {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("list fields", move || {
            registry.list_fields(&database, &collection)
        })
        .await
        .unwrap_or_default()
    }

    /// Renames and/or retypes a field.
    pub async fn update_field(
        &self,
        database: &str,
        collection: &str,
        old: &str,
        new: &str,
        field_type: &str,
    ) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let collection = collection.to_owned();
        let old = old.to_owned();
        let new = new.to_owned();
        let field_type = field_type.to_owned();
        Self::run("update field", move || {
            registry.update_field(&database, &collection, &old, &new, &field_type)
        })
        .await
        .is_some()
    }

    /// Deletes a field, stripping its key from stored records.
    pub async fn delete_field(&self, database: &str, collection: &str, name: &str) -> bool {
        let registry = Arc::clone(&self.registry);
        let database = database.to_owned();
        let collection = collection.to_owned();
        let name = name.to_owned();
        Self::run("delete field", move || {
            registry.delete_field(&database, &collection, &name)
        })
        .await
        .is_some()
    }

    // ----- records -----

    /// Inserts one record after validating every value against its
    /// declared field type.
    pub async fn insert_data(&self, database: &str, collection: &str, values: FieldMap) -> bool {
        let engine = Arc::clone(&self.engine);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("insert data", move || {
            engine.insert(&database, &collection, &values)
        })
        .await
        .is_some()
    }

    /// Queries a collection, optionally filtered by string equality.
    /// Empty on failure.
    pub async fn query_data(
        &self,
        database: &str,
        collection: &str,
        filter: Option<FieldMap>,
    ) -> Vec<FieldMap> {
        let engine = Arc::clone(&self.engine);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("query data", move || {
            engine.query(&database, &collection, filter.as_ref())
        })
        .await
        .unwrap_or_default()
    }

    /// Updates records addressed by position or filter. Exactly one
    /// addressing mode must be usable.
    pub async fn update_data(
        &self,
        database: &str,
        collection: &str,
        position: Option<usize>,
        filter: Option<FieldMap>,
        values: FieldMap,
    ) -> bool {
        let Some(address) = resolve_address(position, filter) else {
            tracing::error!("update data requires a position or a non-empty filter");
            return false;
        };
        let engine = Arc::clone(&self.engine);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("update data", move || {
            engine.update(&database, &collection, &address, &values)
        })
        .await
        .is_some()
    }

    /// Deletes records addressed by position or filter. Exactly one
    /// addressing mode must be usable.
    pub async fn delete_data(
        &self,
        database: &str,
        collection: &str,
        position: Option<usize>,
        filter: Option<FieldMap>,
    ) -> bool {
        let Some(address) = resolve_address(position, filter) else {
            tracing::error!("delete data requires a position or a non-empty filter");
            return false;
        };
        let engine = Arc::clone(&self.engine);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("delete data", move || {
            engine.delete(&database, &collection, &address)
        })
        .await
        .is_some()
    }

    /// Reconciles every record of a collection with its declared field
    /// set.
    pub async fn sync_collection_fields(&self, database: &str, collection: &str) -> bool {
        let engine = Arc::clone(&self.engine);
        let database = database.to_owned();
        let collection = collection.to_owned();
        Self::run("sync collection fields", move || {
            engine.sync_fields(&database, &collection)
        })
        .await
        .is_some()
    }
}

/// Maps the optional position/filter pair onto one addressing mode.
/// A given position always wins; a filter must be non-empty.
fn resolve_address(position: Option<usize>, filter: Option<FieldMap>) -> Option<RecordAddress> {
    match (position, filter) {
        (Some(position), _) => Some(RecordAddress::Position(position)),
        (None, Some(filter)) if !filter.is_empty() => Some(RecordAddress::Filter(filter)),
        _ => None,
    }
}
