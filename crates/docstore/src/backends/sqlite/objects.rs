//! Storing and loading [`DocumentObject`] types.

use crate::core::{DocumentObject, DocumentStorage};
use crate::error::StorageResult;
use crate::types::{Record, Search};

use super::SqliteDocumentStore;

impl SqliteDocumentStore {
    /// Saves an object under its document key and class tag, returning the key.
    pub fn save_object<T: DocumentObject>(&self, object: &T) -> StorageResult<String> {
        let key = object.document_key();
        let record = object.to_record();
        self.write_records(&[(key.as_str(), T::class_name().as_str(), &record)])?;
        Ok(key)
    }

    /// Saves several objects of one type in a single transaction.
    pub fn save_objects<T: DocumentObject>(&self, objects: &[T]) -> StorageResult<()> {
        let class_name = T::class_name();
        let prepared: Vec<(String, Record)> = objects
            .iter()
            .map(|object| (object.document_key(), object.to_record()))
            .collect();
        let entries: Vec<_> = prepared
            .iter()
            .map(|(key, record)| (key.as_str(), class_name.as_str(), record))
            .collect();
        self.write_records(&entries)
    }

    /// Loads the object stored under `key`.
    ///
    /// Returns `None` when the key is absent or holds a document of another
    /// class.
    pub fn load_object<T: DocumentObject>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(document) = self.load_document(key)? else {
            return Ok(None);
        };
        if document.class_name() != T::class_name() {
            tracing::debug!(
                "Document {} has class {}, not {}",
                key,
                document.class_name(),
                T::class_name()
            );
            return Ok(None);
        }
        T::from_record(key, document.into_record(), self.handle()).map(Some)
    }

    /// Searches documents of `T`'s class and rebuilds them as objects.
    ///
    /// Sort descriptors are resolved below [`DocumentObject::sort_root`].
    pub fn search_objects<T: DocumentObject>(&self, search: &Search) -> StorageResult<Vec<T>> {
        let search = search.clone().with_class(T::class_name());
        let documents = self.search_documents_rooted(&search, T::sort_root())?;

        let handle = self.handle();
        documents
            .into_documents()
            .into_iter()
            .map(|document| {
                let key = document.key().to_string();
                T::from_record(&key, document.into_record(), handle.clone())
            })
            .collect()
    }
}
