//! Query result types.
//!
//! Results are built once per query and never mutated afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;

use crate::error::{DocumentError, StorageResult};

use super::stored_document::StoredDocument;
use super::value::{record_to_json, Record};

/// Documents returned by a search, in result order.
///
/// Result order is the requested sort order when [`DocumentSet::is_sorted`]
/// is true, and ascending key order otherwise.
#[derive(Debug, Default)]
pub struct DocumentSet {
    entries: Vec<StoredDocument>,
    sorted: bool,
    failures: Vec<DocumentError>,
}

impl DocumentSet {
    /// Creates a result set.
    pub fn new(entries: Vec<StoredDocument>, sorted: bool) -> Self {
        Self {
            entries,
            sorted,
            failures: Vec::new(),
        }
    }

    /// Attaches keys that matched but could not be rebuilt.
    pub fn with_failures(mut self, failures: Vec<DocumentError>) -> Self {
        self.failures = failures;
        self
    }

    /// Returns the document stored under `key`.
    pub fn get(&self, key: &str) -> Option<&StoredDocument> {
        self.entries.iter().find(|doc| doc.key() == key)
    }

    /// Returns the record stored under `key`.
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.get(key).map(StoredDocument::record)
    }

    /// Returns true if `key` is part of the result.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in result order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(StoredDocument::key).collect()
    }

    /// Iterates documents in result order.
    pub fn iter(&self) -> std::slice::Iter<'_, StoredDocument> {
        self.entries.iter()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the order reflects caller-supplied sort descriptors.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Keys that matched but whose stored rows are inconsistent.
    pub fn failures(&self) -> &[DocumentError] {
        &self.failures
    }

    /// Consumes the set, returning documents in result order.
    pub fn into_documents(self) -> Vec<StoredDocument> {
        self.entries
    }

    /// Consumes the set, returning a key to record map.
    pub fn into_map(self) -> BTreeMap<String, Record> {
        self.entries
            .into_iter()
            .map(|doc| (doc.key().to_string(), doc.into_record()))
            .collect()
    }

    /// Describes the set as a JSON array of `{key, class_name, record}`.
    pub fn to_json(&self) -> serde_json::Value {
        self.entries
            .iter()
            .map(|doc| {
                json!({
                    "key": doc.key(),
                    "class_name": doc.class_name(),
                    "record": record_to_json(doc.record()),
                })
            })
            .collect()
    }
}

impl IntoIterator for DocumentSet {
    type Item = StoredDocument;
    type IntoIter = std::vec::IntoIter<StoredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a StoredDocument;
    type IntoIter = std::slice::Iter<'a, StoredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The result of a search, shaped by the requested [`ReturnShape`](super::ReturnShape).
#[derive(Debug)]
pub enum SearchResults {
    /// Documents with their records.
    Documents(DocumentSet),
    /// Ordered keys.
    Keys(Vec<String>),
}

impl SearchResults {
    /// Number of results.
    pub fn len(&self) -> usize {
        match self {
            SearchResults::Documents(set) => set.len(),
            SearchResults::Keys(keys) => keys.len(),
        }
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in result order, for either shape.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            SearchResults::Documents(set) => set.keys(),
            SearchResults::Keys(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    /// Returns the documents if this is a records result.
    pub fn documents(&self) -> Option<&DocumentSet> {
        match self {
            SearchResults::Documents(set) => Some(set),
            SearchResults::Keys(_) => None,
        }
    }

    /// Consumes the result, returning documents if this is a records result.
    pub fn into_documents(self) -> Option<DocumentSet> {
        match self {
            SearchResults::Documents(set) => Some(set),
            SearchResults::Keys(_) => None,
        }
    }

    /// Consumes the result, returning the ordered keys for either shape.
    pub fn into_keys(self) -> Vec<String> {
        match self {
            SearchResults::Documents(set) => set
                .into_iter()
                .map(|doc| doc.key().to_string())
                .collect(),
            SearchResults::Keys(keys) => keys,
        }
    }
}

/// Rows returned by a raw SQL statement.
///
/// Every cell is rendered as text: integers and reals in their SQLite text
/// form, blobs as base64, NULL as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResult {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawResult {
    /// Creates a raw result.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Column names in statement order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the statement produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first column of the first row.
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }

    /// The value of `column` in row `row`.
    pub fn value_at(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Every value of `column`, or `None` if the column does not exist.
    pub fn values_for_column(&self, column: &str) -> Option<Vec<Option<&str>>> {
        let index = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).and_then(|v| v.as_deref()))
                .collect(),
        )
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Describes the result as JSON: `{"columns": [...], "rows": [[...]]}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "columns": self.columns, "rows": self.rows })
    }

    /// Writes the JSON description to a file.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.to_json())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
