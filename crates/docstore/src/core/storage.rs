//! Core document storage trait.
//!
//! This module defines the [`DocumentStorage`] trait, which provides keyed
//! save, load and remove operations for records.

use crate::error::{DocumentError, StorageResult};
use crate::types::{Record, StoredDocument};

/// Keyed storage of records.
///
/// Saving under an existing key replaces every stored row of that key in one
/// atomic step. A batch either lands completely or not at all.
///
/// # Example
///
/// ```
/// use helios_docstore::core::DocumentStorage;
/// use helios_docstore::backends::sqlite::SqliteDocumentStore;
/// use helios_docstore::types::{Record, Value};
///
/// let store = SqliteDocumentStore::in_memory().unwrap();
///
/// let mut record = Record::new();
/// record.insert("City".to_string(), Value::from("Madrid"));
/// store.save("doc-1", &record).unwrap();
///
/// assert_eq!(store.load("doc-1").unwrap(), record);
/// assert!(store.load("missing").unwrap_err().is_not_found());
/// ```
pub trait DocumentStorage: Send + Sync {
    /// Returns a human-readable name for this storage backend.
    fn backend_name(&self) -> &'static str;

    /// Saves a record under `key` with the store's default class tag.
    fn save(&self, key: &str, record: &Record) -> StorageResult<()>;

    /// Saves several documents in one transaction.
    ///
    /// # Errors
    ///
    /// Any failure rolls back the whole batch; nothing from it is visible
    /// afterwards.
    fn save_batch(&self, documents: &[StoredDocument]) -> StorageResult<()>;

    /// Saves a record under a freshly generated key and returns the key.
    fn insert(&self, record: &Record) -> StorageResult<String> {
        let key = uuid::Uuid::new_v4().to_string();
        self.save(&key, record)?;
        Ok(key)
    }

    /// Loads the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] if the key does not exist.
    fn load(&self, key: &str) -> StorageResult<Record> {
        self.load_document(key)?
            .map(StoredDocument::into_record)
            .ok_or_else(|| {
                DocumentError::NotFound {
                    key: key.to_string(),
                }
                .into()
            })
    }

    /// Loads a record together with its class tag and creation time.
    fn load_document(&self, key: &str) -> StorageResult<Option<StoredDocument>>;

    /// Removes the given keys and returns how many existed.
    fn remove(&self, keys: &[&str]) -> StorageResult<usize>;

    /// Removes every document and returns how many existed.
    fn remove_all(&self) -> StorageResult<usize>;

    /// Number of stored documents.
    fn count(&self) -> StorageResult<usize>;

    /// Every stored key, in ascending order.
    fn all_keys(&self) -> StorageResult<Vec<String>>;

    /// Returns true if `key` is stored.
    fn contains(&self, key: &str) -> StorageResult<bool>;
}
