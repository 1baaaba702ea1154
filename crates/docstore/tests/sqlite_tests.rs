//! SQLite backend integration tests.
//!
//! These tests cover keyed storage: round trips, replacement, batches and
//! the persisted format.

mod common;

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use serde_json::json;

use helios_docstore::backends::sqlite::{SCHEMA_VERSION, SqliteDocumentStore};
use helios_docstore::core::{DocumentStorage, SearchProvider};
use helios_docstore::error::{BackendError, DocumentError, StorageError, ValueError};
use helios_docstore::types::{Number, Record, StoredDocument, Value};
use helios_docstore::StoreConfig;

use common::*;

// ============================================================================
// Round Trip Tests
// ============================================================================

#[test]
fn test_round_trip_every_value_type() {
    let store = create_store();

    let mut nested = BTreeMap::new();
    nested.insert("City".to_string(), Value::from("Madrid"));
    nested.insert("Zip".to_string(), Value::from(28001));

    let mut rec = Record::new();
    rec.insert("Text".to_string(), Value::from("hello"));
    rec.insert("Integer".to_string(), Value::from(-42));
    rec.insert("Float".to_string(), Value::from(3.25));
    rec.insert(
        "Date".to_string(),
        Value::from(Utc.with_ymd_and_hms(2024, 2, 29, 13, 45, 7).unwrap()),
    );
    rec.insert("Blob".to_string(), Value::blob(vec![0u8, 159, 146, 150, 255]));
    rec.insert("Empty".to_string(), Value::from(""));
    rec.insert("Address".to_string(), Value::Mapping(nested));
    rec.insert(
        "Tags".to_string(),
        Value::Sequence(vec![Value::from("a"), Value::from(1), Value::Sequence(vec![])]),
    );
    rec.insert("Nothing".to_string(), Value::empty_mapping());

    store.save("doc-1", &rec).unwrap();
    let loaded = store.load("doc-1").unwrap();

    assert_eq!(loaded, rec);
    assert_eq!(loaded["Integer"], Value::Number(Number::Integer(-42)));
    assert_eq!(loaded["Float"], Value::Number(Number::Float(3.25)));
}

#[test]
fn test_keys_with_separator_characters() {
    let store = create_store();
    let rec = record(json!({
        "a.b": {"c\\d": 1},
        "a": {"b": 2}
    }));

    store.save("dots", &rec).unwrap();
    assert_eq!(store.load("dots").unwrap(), rec);
}

#[test]
fn test_empty_string_keys_round_trip() {
    let store = create_store();

    let nested = record(json!({"": {"a": 1}}));
    store.save("nested", &nested).unwrap();
    assert_eq!(store.load("nested").unwrap(), nested);

    let beside_index = record(json!({"": [5], "0": "x", "a": {"": {"": 1}}}));
    store.save("beside", &beside_index).unwrap();
    assert_eq!(store.load("beside").unwrap(), beside_index);
}

#[test]
fn test_sequence_order_beyond_ten_elements() {
    let store = create_store();
    let items: Vec<String> = (0..15).map(|i| format!("item-{i}")).collect();
    let rec = record(json!({ "Items": items, "Nested": [{"List": items}] }));

    store.save("long", &rec).unwrap();
    let loaded = store.load("long").unwrap();

    let loaded_items: Vec<&str> = loaded["Items"]
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_text().unwrap())
        .collect();
    assert_eq!(loaded_items, items.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(loaded, rec);
}

#[test]
fn test_resave_replaces_all_rows() {
    let store = create_store();
    store
        .save("k", &record(json!({"a": 1, "b": {"c": [1, 2, 3]}})))
        .unwrap();

    let replacement = record(json!({"z": "only"}));
    store.save("k", &replacement).unwrap();

    assert_eq!(store.load("k").unwrap(), replacement);
    let rows = store
        .execute_raw("SELECT COUNT(*) FROM doc_values WHERE doc_key = 'k'")
        .unwrap();
    assert_eq!(rows.first_value(), Some("1"));
}

#[test]
fn test_resave_keeps_creation_time() {
    let store = create_store();
    let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let doc = StoredDocument::with_created_at("k", "Note", created, record(json!({"v": 1})));
    store.save_batch(&[doc]).unwrap();

    store.save("k", &record(json!({"v": 2}))).unwrap();

    let loaded = store.load_document("k").unwrap().unwrap();
    assert_eq!(loaded.created_at(), created);
    assert_eq!(loaded.class_name(), "Dictionary");
    assert_eq!(loaded.get("v"), Some(&Value::from(2)));
}

// ============================================================================
// Keyed Access Tests
// ============================================================================

#[test]
fn test_load_missing_key() {
    let store = create_store();
    let err = store.load("nope").unwrap_err();
    assert_not_found(&err);
    assert!(store.load_document("nope").unwrap().is_none());
}

#[test]
fn test_insert_generates_keys() {
    let store = create_store();
    let first = store.insert(&record(json!({"n": 1}))).unwrap();
    let second = store.insert(&record(json!({"n": 2}))).unwrap();

    assert_ne!(first, second);
    assert_eq!(store.count().unwrap(), 2);
    assert!(store.contains(&first).unwrap());
}

#[test]
fn test_empty_key_is_rejected() {
    let store = create_store();
    let err = store.save("", &Record::new()).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Document(DocumentError::InvalidKey { .. })
    ));
}

#[test]
fn test_all_keys_sorted() {
    let store = create_store();
    for key in ["c", "a", "b"] {
        store.save(key, &record(json!({"k": key}))).unwrap();
    }
    assert_keys(&store.all_keys().unwrap(), &["a", "b", "c"]);
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_batch_is_atomic() {
    let store = create_store();
    store.save("existing", &record(json!({"v": "before"}))).unwrap();

    let mut bad = Record::new();
    bad.insert("Value".to_string(), Value::from(f64::NAN));

    let batch = vec![
        StoredDocument::new("existing", "Dictionary", record(json!({"v": "after"}))),
        StoredDocument::new("new-1", "Dictionary", record(json!({"v": 1}))),
        StoredDocument::new("new-2", "Dictionary", bad),
    ];

    let err = store.save_batch(&batch).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Value(ValueError::UnsupportedValueType { .. })
    ));

    assert_eq!(store.count().unwrap(), 1);
    assert!(!store.contains("new-1").unwrap());
    assert_eq!(
        store.load("existing").unwrap(),
        record(json!({"v": "before"}))
    );
}

#[test]
fn test_batch_stores_class_names() {
    let store = create_store();
    seed_employees(&store);

    let doc = store.load_document("e3").unwrap().unwrap();
    assert_eq!(doc.class_name(), "Employee");
    assert_eq!(doc.get("Salary"), Some(&Value::from(30)));
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_reopen_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    {
        let store = SqliteDocumentStore::open(&path).unwrap();
        store.save("k", &record(json!({"Salary": 10}))).unwrap();
    }

    let store = SqliteDocumentStore::open(&path).unwrap();
    assert_eq!(store.load("k").unwrap(), record(json!({"Salary": 10})));
    assert!(store.registry().sole_datatype("Salary").is_some());
}

#[test]
fn test_newer_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    drop(SqliteDocumentStore::open(&path).unwrap());
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION + 1])
            .unwrap();
    }

    let err = SqliteDocumentStore::open(&path).unwrap_err();
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_store_with_custom_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::default()
        .with_wal(false)
        .with_default_class_name("Note")
        .with_bulk_load_chunk_size(2);
    let store = SqliteDocumentStore::with_config(dir.path().join("c.db"), config).unwrap();

    for i in 0..5 {
        store.save(&format!("k{i}"), &record(json!({"i": i}))).unwrap();
    }
    assert_eq!(store.load_document("k4").unwrap().unwrap().class_name(), "Note");
    assert_eq!(store.config().bulk_load_chunk_size, 2);
}
