//! Shared fixtures for the integration suite.

use std::sync::Arc;

use tempfile::TempDir;

use flexdb_core::{Catalog, FieldMap, RecordEngine, SchemaRegistry, StoreConfig};

/// A registry and engine over a fresh temporary catalog.
pub struct TestStore {
    /// Keeps the temp dir alive for the duration of the test
    pub _dir: TempDir,
    pub config: StoreConfig,
    pub registry: SchemaRegistry,
    pub engine: RecordEngine,
}

/// Opens a store in a fresh temp directory with a short reset delay.
pub fn test_store() -> TestStore {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        reset_delay_ms: 10,
        ..Default::default()
    };
    let catalog = Arc::new(Catalog::open(&config).unwrap());
    TestStore {
        _dir: dir,
        config: config.clone(),
        registry: SchemaRegistry::new(Arc::clone(&catalog), config),
        engine: RecordEngine::new(catalog),
    }
}

/// Builds a field map from a JSON object literal.
pub fn obj(value: serde_json::Value) -> FieldMap {
    value.as_object().unwrap().clone()
}

/// Creates a database with one collection and the given fields.
pub fn seed_collection(store: &TestStore, db: &str, coll: &str, fields: &[(&str, &str)]) {
    store.registry.create_database(db).unwrap();
    store.registry.create_collection(db, coll).unwrap();
    for (name, field_type) in fields {
        store.registry.create_field(db, coll, name, field_type).unwrap();
    }
}
