//! Stored document types.
//!
//! This module defines the [`StoredDocument`] type, which wraps a record with
//! the metadata kept in `doc_keys`: its key, its class tag and the time it
//! was first stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::path::split_path;

use super::value::{Record, Value};

/// A record with persistence metadata.
///
/// # Examples
///
/// ```
/// use helios_docstore::types::{Record, StoredDocument, Value};
///
/// let mut record = Record::new();
/// record.insert("City".to_string(), Value::from("Madrid"));
///
/// let doc = StoredDocument::new("doc-1", "Person", record);
/// assert_eq!(doc.key(), "doc-1");
/// assert_eq!(doc.class_name(), "Person");
/// assert_eq!(doc.get("City"), Some(&Value::from("Madrid")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// The document key.
    key: String,

    /// The class tag recorded when the document was saved.
    class_name: String,

    /// When the key was first stored.
    created_at: DateTime<Utc>,

    /// The document content.
    record: Record,
}

impl StoredDocument {
    /// Creates a document stamped with the current time.
    pub fn new(key: impl Into<String>, class_name: impl Into<String>, record: Record) -> Self {
        Self {
            key: key.into(),
            class_name: class_name.into(),
            created_at: Utc::now(),
            record,
        }
    }

    /// Creates a document with an explicit creation time.
    pub fn with_created_at(
        key: impl Into<String>,
        class_name: impl Into<String>,
        created_at: DateTime<Utc>,
        record: Record,
    ) -> Self {
        Self {
            key: key.into(),
            class_name: class_name.into(),
            created_at,
            record,
        }
    }

    /// Returns the document key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the class tag.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Consumes the document, returning its record.
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Looks up an escaped, dotted key path in the record.
    pub fn get(&self, key_path: &str) -> Option<&Value> {
        let segments = split_path(key_path);
        let (first, rest) = segments.split_first()?;
        self.record.get(first)?.lookup_segments(rest)
    }

    pub(crate) fn set_record(&mut self, record: Record) {
        self.record = record;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_nested_path() {
        let mut address = Record::new();
        address.insert("city".to_string(), Value::from("Lyon"));
        let mut record = Record::new();
        record.insert("address".to_string(), Value::Mapping(address));
        record.insert(
            "phones".to_string(),
            Value::Sequence(vec![Value::from("111"), Value::from("222")]),
        );

        let doc = StoredDocument::new("k", "Person", record);
        assert_eq!(doc.get("address.city"), Some(&Value::from("Lyon")));
        assert_eq!(doc.get("phones.1"), Some(&Value::from("222")));
        assert_eq!(doc.get("phones.2"), None);
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn test_get_escaped_key() {
        let mut record = Record::new();
        record.insert("v1.2".to_string(), Value::from("dotted"));
        let doc = StoredDocument::new("k", "Release", record);
        assert_eq!(doc.get("v1\\.2"), Some(&Value::from("dotted")));
        assert_eq!(doc.get("v1.2"), None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut record = Record::new();
        record.insert("n".to_string(), Value::from(3));
        let doc = StoredDocument::new("k", "Thing", record);
        let json = serde_json::to_string(&doc).unwrap();
        let back: StoredDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
