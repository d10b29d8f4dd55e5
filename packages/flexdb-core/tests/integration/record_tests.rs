//! Record engine tests: insert validation, query projection, positional
//! and filter addressing.

use serde_json::json;

use flexdb_core::{DbError, RecordAddress, POSITION_KEY};

use super::helpers::{obj, seed_collection, test_store};

#[test]
fn test_insert_rejects_undeclared_key() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);

    let result = store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt", "color": "red"})));
    assert!(matches!(result, Err(DbError::UndeclaredFields { .. })));

    // Nothing was written.
    assert!(store.engine.query("shop", "items", None).unwrap().is_empty());
}

#[test]
fn test_insert_rejects_bad_value_and_writes_nothing() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("name", "STRING"), ("qty", "INTEGER")],
    );

    let result = store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt", "qty": "many"})));
    assert!(matches!(result, Err(DbError::TypeMismatch { .. })));
    assert!(store.engine.query("shop", "items", None).unwrap().is_empty());
}

#[test]
fn test_insert_coerces_numeric_strings() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("qty", "INTEGER"), ("price", "DOUBLE"), ("active", "BOOLEAN")],
    );
    store
        .engine
        .insert(
            "shop",
            "items",
            &obj(json!({"qty": "12", "price": "9.99", "active": "True"})),
        )
        .unwrap();

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["qty"], json!(12));
    assert_eq!(results[0]["price"], json!(9.99));
    assert_eq!(results[0]["active"], json!(true));
}

#[test]
fn test_insert_silently_drops_id_key() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    store
        .engine
        .insert(
            "shop",
            "items",
            &obj(json!({"name": "bolt", "id": "x", "ID": "y"})),
        )
        .unwrap();

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].contains_key("id"));
    assert!(!results[0].contains_key("ID"));
}

#[test]
fn test_query_projects_declared_fields_with_nulls() {
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

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results.len(), 1);
    let row = &results[0];
    assert_eq!(row[POSITION_KEY], json!(0));
    assert_eq!(row["name"], json!("bolt"));
    // Declared but absent from the payload: surfaced as null.
    assert_eq!(row["qty"], serde_json::Value::Null);
}

#[test]
fn test_query_positions_are_ordinals() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("n", "INTEGER")]);
    for n in 0..4 {
        store
            .engine
            .insert("shop", "items", &obj(json!({"n": n})))
            .unwrap();
    }

    let results = store.engine.query("shop", "items", None).unwrap();
    let positions: Vec<_> = results.iter().map(|r| r[POSITION_KEY].clone()).collect();
    assert_eq!(positions, vec![json!(0), json!(1), json!(2), json!(3)]);
}

#[test]
fn test_query_filter_is_string_equality() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("name", "STRING"), ("qty", "INTEGER")],
    );
    for (name, qty) in [("bolt", 12), ("nut", 12), ("washer", 3)] {
        store
            .engine
            .insert("shop", "items", &obj(json!({"name": name, "qty": qty})))
            .unwrap();
    }

    // Filter values arrive as text; matching compares text forms.
    let results = store
        .engine
        .query("shop", "items", Some(&obj(json!({"qty": "12"}))))
        .unwrap();
    assert_eq!(results.len(), 2);

    let results = store
        .engine
        .query("shop", "items", Some(&obj(json!({"qty": "12", "name": "nut"}))))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], json!("nut"));

    // A filter key that is not part of the result set matches nothing.
    let results = store
        .engine
        .query("shop", "items", Some(&obj(json!({"ghost": "1"}))))
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_price_scenario() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("price", "DOUBLE")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"price": "9.99"})))
        .unwrap();

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["price"], json!(9.99));
    assert!(!results[0].contains_key("id"));
}

#[test]
fn test_positional_update_merges_without_validation() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("qty", "INTEGER")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"qty": 1})))
        .unwrap();

    // Updates merge raw values; the declared INTEGER type is not
    // re-checked on this path.
    store
        .engine
        .update(
            "shop",
            "items",
            &RecordAddress::Position(0),
            &obj(json!({"qty": "lots"})),
        )
        .unwrap();

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results[0]["qty"], json!("lots"));
}

#[test]
fn test_positional_update_out_of_range_fails_cleanly() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("qty", "INTEGER")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"qty": 1})))
        .unwrap();

    let result = store.engine.update(
        "shop",
        "items",
        &RecordAddress::Position(5),
        &obj(json!({"qty": 2})),
    );
    assert!(matches!(result, Err(DbError::PositionOutOfRange { .. })));

    // No record was touched.
    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results[0]["qty"], json!(1));
}

#[test]
fn test_update_on_empty_collection_fails() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("qty", "INTEGER")]);
    let result = store.engine.update(
        "shop",
        "items",
        &RecordAddress::Position(0),
        &obj(json!({"qty": 2})),
    );
    assert!(matches!(result, Err(DbError::NoRecords(_))));
}

#[test]
fn test_filter_update_touches_all_matches() {
    let store = test_store();
    seed_collection(
        &store,
        "shop",
        "items",
        &[("name", "STRING"), ("qty", "INTEGER")],
    );
    for name in ["bolt", "bolt", "nut"] {
        store
            .engine
            .insert("shop", "items", &obj(json!({"name": name, "qty": 1})))
            .unwrap();
    }

    let updated = store
        .engine
        .update(
            "shop",
            "items",
            &RecordAddress::Filter(obj(json!({"name": "bolt"}))),
            &obj(json!({"qty": 2})),
        )
        .unwrap();
    assert_eq!(updated, 2);

    let results = store
        .engine
        .query("shop", "items", Some(&obj(json!({"qty": "2"}))))
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn test_filter_update_requires_a_match() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt"})))
        .unwrap();

    let result = store.engine.update(
        "shop",
        "items",
        &RecordAddress::Filter(obj(json!({"name": "ghost"}))),
        &obj(json!({"name": "seen"})),
    );
    assert!(matches!(result, Err(DbError::NoMatches)));
}

#[test]
fn test_empty_filter_is_not_an_address() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"name": "bolt"})))
        .unwrap();

    let result = store.engine.update(
        "shop",
        "items",
        &RecordAddress::Filter(obj(json!({}))),
        &obj(json!({"name": "x"})),
    );
    assert!(matches!(result, Err(DbError::MissingAddress)));
    assert!(matches!(
        store
            .engine
            .delete("shop", "items", &RecordAddress::Filter(obj(json!({})))),
        Err(DbError::MissingAddress)
    ));
}

#[test]
fn test_positional_delete_removes_exactly_one() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("n", "INTEGER")]);
    for n in [10, 20, 30] {
        store
            .engine
            .insert("shop", "items", &obj(json!({"n": n})))
            .unwrap();
    }

    let deleted = store
        .engine
        .delete("shop", "items", &RecordAddress::Position(1))
        .unwrap();
    assert_eq!(deleted, 1);

    let results = store.engine.query("shop", "items", None).unwrap();
    let remaining: Vec<_> = results.iter().map(|r| r["n"].clone()).collect();
    assert_eq!(remaining, vec![json!(10), json!(30)]);
}

#[test]
fn test_positional_delete_out_of_range_fails_cleanly() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("n", "INTEGER")]);
    store
        .engine
        .insert("shop", "items", &obj(json!({"n": 1})))
        .unwrap();

    assert!(matches!(
        store
            .engine
            .delete("shop", "items", &RecordAddress::Position(3)),
        Err(DbError::PositionOutOfRange { .. })
    ));
    assert_eq!(store.engine.query("shop", "items", None).unwrap().len(), 1);
}

#[test]
fn test_filter_delete_removes_all_matches() {
    let store = test_store();
    seed_collection(&store, "shop", "items", &[("name", "STRING")]);
    for name in ["bolt", "bolt", "nut"] {
        store
            .engine
            .insert("shop", "items", &obj(json!({"name": name})))
            .unwrap();
    }

    let deleted = store
        .engine
        .delete(
            "shop",
            "items",
            &RecordAddress::Filter(obj(json!({"name": "bolt"}))),
        )
        .unwrap();
    assert_eq!(deleted, 2);

    let results = store.engine.query("shop", "items", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], json!("nut"));
}
