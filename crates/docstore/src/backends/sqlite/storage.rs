//! DocumentStorage implementation for SQLite.

use std::slice;

use chrono::Utc;

use crate::core::DocumentStorage;
use crate::error::StorageResult;
use crate::types::{Record, StoredDocument};

use super::backend::BACKEND_NAME;
use super::search_impl::load_documents;
use super::transaction::with_write;
use super::writer::{delete_documents, write_document};
use super::SqliteDocumentStore;

impl DocumentStorage for SqliteDocumentStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn save(&self, key: &str, record: &Record) -> StorageResult<()> {
        let class_name = &self.config().default_class_name;
        self.write_records(&[(key, class_name.as_str(), record)])
    }

    fn save_batch(&self, documents: &[StoredDocument]) -> StorageResult<()> {
        let entries: Vec<_> = documents
            .iter()
            .map(|doc| (doc.key(), doc.class_name(), doc.record()))
            .collect();
        self.write_records(&entries)
    }

    fn load_document(&self, key: &str) -> StorageResult<Option<StoredDocument>> {
        let conn = self.connection();
        let (mut documents, mut failures) =
            load_documents(&conn, slice::from_ref(&key.to_string()), 1)?;

        if let Some(failure) = failures.pop() {
            return Err(failure.into());
        }
        Ok(documents.pop())
    }

    fn remove(&self, keys: &[&str]) -> StorageResult<usize> {
        let conn = self.connection();
        let removed = with_write(&conn, |conn| delete_documents(conn, keys))?;
        tracing::debug!("Removed {} of {} requested documents", removed, keys.len());
        Ok(removed)
    }

    fn remove_all(&self) -> StorageResult<usize> {
        let conn = self.connection();
        let removed = with_write(&conn, |conn| {
            conn.execute("DELETE FROM doc_values", [])?;
            conn.execute("DELETE FROM attribute_datatypes", [])?;
            Ok(conn.execute("DELETE FROM doc_keys", [])?)
        })?;
        // Inside an explicit transaction a later rollback reloads from disk.
        self.inner.registry.write().clear();
        tracing::debug!("Removed all {} documents", removed);
        Ok(removed)
    }

    fn count(&self) -> StorageResult<usize> {
        let conn = self.connection();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM doc_keys", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn all_keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT doc_key FROM doc_keys ORDER BY doc_key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let conn = self.connection();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM doc_keys WHERE doc_key = ?1)",
            [key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl SqliteDocumentStore {
    /// Writes `(key, class_name, record)` entries in one write scope.
    ///
    /// On success the stored datatypes are added to the registry cache. On
    /// failure nothing is written and the cache is rebuilt from disk.
    pub(crate) fn write_records(&self, entries: &[(&str, &str, &Record)]) -> StorageResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        tracing::debug!("Saving batch of {} documents", entries.len());

        let conn = self.connection();
        let now = Utc::now();
        let result = with_write(&conn, |conn| {
            let mut registered = Vec::new();
            for (key, class_name, record) in entries {
                registered.extend(write_document(conn, key, class_name, now, record)?);
            }
            Ok(registered)
        });

        match result {
            Ok(registered) => {
                let mut registry = self.inner.registry.write();
                for (attribute, datatype) in registered {
                    registry.register(attribute, datatype);
                }
                Ok(())
            }
            Err(err) => {
                if let Err(reload_err) = self.reload_registry_locked(&conn) {
                    tracing::warn!("Failed to reload datatype registry: {}", reload_err);
                }
                Err(err)
            }
        }
    }
}
