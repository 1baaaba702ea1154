//! Raw SQL integration tests.

mod common;

use serde_json::json;

use helios_docstore::core::{DocumentStorage, SearchProvider};
use helios_docstore::types::{ReturnShape, Value};

use common::*;

#[test]
fn test_execute_raw_returns_text_rows() {
    let store = create_store();
    seed_employees(&store);

    let result = store
        .execute_raw(
            "SELECT doc_key, value FROM doc_values WHERE attribute = 'Salary' ORDER BY doc_key",
        )
        .unwrap();

    assert_eq!(result.columns(), ["doc_key", "value"]);
    assert_eq!(result.row_count(), 5);
    assert_eq!(result.first_value(), Some("e1"));
    assert_eq!(result.value_at(1, "value"), Some("20"));
    assert_eq!(
        result.values_for_column("value").unwrap(),
        vec![Some("10"), Some("20"), Some("30"), Some("40"), Some("50")]
    );
    assert!(result.values_for_column("nope").is_none());
}

#[test]
fn test_execute_raw_encodes_blobs() {
    let store = create_store();
    let mut rec = helios_docstore::types::Record::new();
    rec.insert("Data".to_string(), Value::blob(b"hi".to_vec()));
    store.save("blob", &rec).unwrap();

    let result = store
        .execute_raw("SELECT value, NULL AS missing FROM doc_values WHERE attribute = 'Data'")
        .unwrap();
    assert_eq!(result.value_at(0, "value"), Some("aGk="));
    assert_eq!(result.value_at(0, "missing"), None);
}

#[test]
fn test_execute_raw_surfaces_sqlite_errors() {
    let store = create_store();
    let err = store.execute_raw("SELECT * FROM no_such_table").unwrap_err();
    assert!(err.to_string().contains("no_such_table"));
}

#[test]
fn test_raw_keys_rewrite_keeps_where_clause() {
    let store = create_store();
    seed_employees(&store);

    let results = store
        .execute_raw_as(
            "SELECT value FROM doc_values WHERE attribute = 'City' AND value = 'Madrid' ORDER BY doc_key",
            ReturnShape::Keys,
        )
        .unwrap();
    assert_keys(&results.into_keys(), &["e1", "e3", "e5"]);
}

#[test]
fn test_raw_records_rewrite() {
    let store = create_store();
    seed_employees(&store);

    let results = store
        .execute_raw_as(
            "SELECT * FROM doc_keys WHERE doc_key IN (SELECT doc_key FROM doc_values WHERE attribute = 'Country' AND value = 'France')",
            ReturnShape::Records,
        )
        .unwrap();

    assert_key_set(&results, &["e4"]);
    let documents = results.into_documents().unwrap();
    let dee = documents.get("e4").unwrap();
    assert_eq!(dee.class_name(), "Employee");
    assert_eq!(dee.record(), &EmployeeFixture::new("e4", "Dee", 40).living_in("Paris", "France").flat_record());
}

#[test]
fn test_raw_records_with_matching_columns_run_verbatim() {
    let store = create_store();
    store.save("k", &record(json!({"a": [1, 2]}))).unwrap();

    let results = store
        .execute_raw_as(
            "SELECT doc_key, snapshot, class_name, created_at FROM doc_keys",
            ReturnShape::Records,
        )
        .unwrap();
    let documents = results.into_documents().unwrap();
    assert_eq!(documents.record("k"), Some(&record(json!({"a": [1, 2]}))));
}

#[test]
fn test_malformed_raw_statements_never_run() {
    let store = create_store();
    seed_employees(&store);

    for sql in [
        "",
        "DELETE FROM doc_keys",
        "WITH x AS (SELECT doc_key FROM doc_keys) SELECT doc_key FROM x",
        "SELECT (SELECT 1) FROM doc_keys",
        "SELECT doc_key FROM doc_keys WHERE doc_key = 'unterminated",
        "SELECT value FROM doc_values WHERE attribute = 'City' \
         UNION SELECT value FROM doc_values WHERE attribute = 'Country'",
    ] {
        let err = store.execute_raw_as(sql, ReturnShape::Keys).unwrap_err();
        assert_malformed(&err);
    }
    assert_eq!(store.count().unwrap(), 5);
}

#[test]
fn test_compound_select_never_returns_values_as_keys() {
    let store = create_store();
    seed_employees(&store);

    for shape in [ReturnShape::Keys, ReturnShape::Records] {
        let err = store
            .execute_raw_as(
                "SELECT value FROM doc_values WHERE attribute = 'City' \
                 UNION SELECT value FROM doc_values WHERE attribute = 'Country'",
                shape,
            )
            .unwrap_err();
        assert_malformed(&err);
    }
}

#[test]
fn test_explain_returns_plan() {
    let store = create_store();
    let plan = store
        .explain("SELECT doc_key FROM doc_values WHERE attribute = 'City'")
        .unwrap();
    assert!(!plan.is_empty());
    assert!(plan.columns().iter().any(|c| c == "detail"));
}

#[test]
fn test_raw_result_written_to_file() {
    let store = create_store();
    seed_employees(&store);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.json");

    let result = store
        .execute_raw("SELECT COUNT(*) AS total FROM doc_keys")
        .unwrap();
    result.write_to(&path).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, result.to_json());
}
