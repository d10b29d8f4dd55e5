//! Drift reconciliation tests.

use serde_json::json;

use flexdb_core::RecordAddress;

use super::helpers::{obj, seed_collection, test_store};

#[test]
fn test_sync_adds_missing_fields_as_null() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt"})))
        .unwrap();

    // Declare a second field after the record already exists.
    store
        .registry
        .create_field("shop", "items", "qty", "INTEGER")
        .unwrap();
    store.engine.sync_fields("shop", "items").unwrap();

    // The null is now explicit in the stored payload, so dropping the
    // declaration turns it into a stray key the next sync removes.
    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results[0]["qty"], serde_json::Value::Null);
}

#[test]
fn test_sync_strips_undeclared_keys() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("name", "STRING"), ("qty", "INTEGER")],
    );
    store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt", "qty": 1})))
        .unwrap();

    // Drift in via unvalidated merge, then drop a declared field's
    // counterpart by deleting the declaration only.
    store
        .engine
        .update(
            "shop",
            "items",
            &RecordAddress::Position(0),
            &obj(json!({"color": "red"})),
        )
        .unwrap();

    store.engine.sync_fields("shop", "items").unwrap();

    // The stray key is gone from the payload: filtering on it finds nothing.
    let results = store
        .engine
        .query("shop", "items", Some(&obj(json!({"name": "bolt"}))))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].contains_key("color"));
    let by_color = store.engine.update(
        "shop",
        "items",
        &RecordAddress::Filter(obj(json!({"color": "red"}))),
        &obj(json!({"qty": 2})),
    );
    assert!(by_color.is_err());
}

#[test]
fn test_sync_is_idempotent() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("name", "STRING"), ("qty", "INTEGER")],
    );
    store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt"})))
        .unwrap();
    store
        .engine
        .update(
            "shop",
            "items",
            &RecordAddress::Position(0),
            &obj(json!({"stray": true})),
        )
        .unwrap();

    store.engine.sync_fields("shop", "items").unwrap();
    let first = store.engine.query("shop", "items", None).unwrap();

    store.engine.sync_fields("shop", "items").unwrap();
    let second = store.engine.query("shop", "items", None).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_sync_on_empty_collection_succeeds() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    store.engine.sync_fields("shop", "items").unwrap();
}
