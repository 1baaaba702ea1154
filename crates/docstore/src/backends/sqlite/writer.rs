//! Row-level writes of documents.
//!
//! These functions expect to run inside a write scope and never commit on
//! their own.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::document::codec::{format_date, to_canonical};
use crate::document::{flatten, Datatype, StoredValue};
use crate::error::{DocumentError, StorageResult};
use crate::types::Record;

/// Replaces every row stored under `key` with the rows of `record`.
///
/// A key that already exists keeps its original creation time. Returns the
/// `(attribute, datatype)` pairs of the stored leaves.
pub(crate) fn write_document(
    conn: &Connection,
    key: &str,
    class_name: &str,
    created_at: DateTime<Utc>,
    record: &Record,
) -> StorageResult<Vec<(String, Datatype)>> {
    if key.is_empty() {
        return Err(DocumentError::InvalidKey {
            message: "document keys must not be empty".to_string(),
        }
        .into());
    }

    let triples = flatten(record)?;
    let snapshot = to_canonical(record)?;

    let existing_created_at: Option<String> = conn
        .query_row(
            "SELECT created_at FROM doc_keys WHERE doc_key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    let created_at = existing_created_at.unwrap_or_else(|| format_date(&created_at));

    conn.execute("DELETE FROM doc_values WHERE doc_key = ?1", [key])?;
    conn.execute("DELETE FROM doc_keys WHERE doc_key = ?1", [key])?;

    conn.execute(
        "INSERT INTO doc_keys (doc_key, snapshot, class_name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![key, snapshot, class_name, created_at],
    )?;

    let mut insert_value = conn.prepare_cached(
        "INSERT INTO doc_values (doc_key, attribute, value, datatype) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut register = conn.prepare_cached(
        "INSERT OR IGNORE INTO attribute_datatypes (attribute, datatype) VALUES (?1, ?2)",
    )?;

    let mut registered = Vec::new();
    for triple in triples {
        let datatype = triple.datatype.as_str();
        match &triple.value {
            StoredValue::Text(text) => {
                insert_value.execute(params![key, triple.attribute, text, datatype])?
            }
            StoredValue::Blob(bytes) => {
                insert_value.execute(params![key, triple.attribute, bytes, datatype])?
            }
        };

        if !triple.datatype.is_marker() {
            register.execute(params![triple.attribute, datatype])?;
            registered.push((triple.attribute, triple.datatype));
        }
    }

    Ok(registered)
}

/// Deletes the given keys and returns how many existed.
pub(crate) fn delete_documents(conn: &Connection, keys: &[&str]) -> StorageResult<usize> {
    let mut delete_values = conn.prepare_cached("DELETE FROM doc_values WHERE doc_key = ?1")?;
    let mut delete_key = conn.prepare_cached("DELETE FROM doc_keys WHERE doc_key = ?1")?;

    let mut removed = 0;
    for key in keys {
        delete_values.execute([key])?;
        removed += delete_key.execute([key])?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::sqlite::schema::initialize_schema;
    use crate::types::{record_from_json, Value};
    use serde_json::json;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn
    }

    fn value_rows(conn: &Connection, key: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM doc_values WHERE doc_key = ?1",
            [key],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_write_document_rows() {
        let conn = setup();
        let record = record_from_json(json!({
            "Name": "Ann",
            "Tags": ["a", "b"]
        }))
        .unwrap();

        let registered = write_document(&conn, "k1", "Dictionary", Utc::now(), &record).unwrap();

        // Name, Tags marker, Tags.0, Tags.1
        assert_eq!(value_rows(&conn, "k1"), 4);
        assert_eq!(registered.len(), 3);
        assert!(registered.contains(&("Name".to_string(), Datatype::Text)));
    }

    #[test]
    fn test_rewrite_replaces_rows_and_keeps_created_at() {
        let conn = setup();
        let first = record_from_json(json!({"a": 1, "b": 2, "c": 3})).unwrap();
        let earlier = Utc::now() - chrono::Duration::days(3);
        write_document(&conn, "k1", "Dictionary", earlier, &first).unwrap();

        let mut second = Record::new();
        second.insert("a".to_string(), Value::from("one"));
        write_document(&conn, "k1", "Person", Utc::now(), &second).unwrap();

        assert_eq!(value_rows(&conn, "k1"), 1);
        let (class_name, created_at): (String, String) = conn
            .query_row(
                "SELECT class_name, created_at FROM doc_keys WHERE doc_key = 'k1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(class_name, "Person");
        assert_eq!(created_at, format_date(&earlier));
    }

    #[test]
    fn test_blob_is_stored_as_blob() {
        let conn = setup();
        let mut record = Record::new();
        record.insert("Data".to_string(), Value::blob(vec![0u8, 1, 2]));
        write_document(&conn, "k1", "Dictionary", Utc::now(), &record).unwrap();

        let storage_class: String = conn
            .query_row("SELECT typeof(value) FROM doc_values", [], |row| row.get(0))
            .unwrap();
        assert_eq!(storage_class, "blob");
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let conn = setup();
        let err = write_document(&conn, "", "Dictionary", Utc::now(), &Record::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::StorageError::Document(DocumentError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_delete_documents_counts_existing() {
        let conn = setup();
        let record = record_from_json(json!({"a": 1})).unwrap();
        write_document(&conn, "k1", "Dictionary", Utc::now(), &record).unwrap();
        write_document(&conn, "k2", "Dictionary", Utc::now(), &record).unwrap();

        assert_eq!(delete_documents(&conn, &["k1", "missing"]).unwrap(), 1);
        assert_eq!(value_rows(&conn, "k1"), 0);
        assert_eq!(value_rows(&conn, "k2"), 1);
    }
}
