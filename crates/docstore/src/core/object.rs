//! Adapter between application types and stored records.

use crate::backends::sqlite::StoreHandle;
use crate::error::StorageResult;
use crate::types::Record;

/// A type that can be stored as a document.
///
/// Objects are stored under their [`class_name`](DocumentObject::class_name)
/// and rebuilt through [`from_record`](DocumentObject::from_record), which
/// receives a non-owning handle back to the store they came from.
///
/// # Example
///
/// ```
/// use helios_docstore::backends::sqlite::{SqliteDocumentStore, StoreHandle};
/// use helios_docstore::core::DocumentObject;
/// use helios_docstore::types::{Record, Value};
/// use helios_docstore::StorageResult;
///
/// struct Person {
///     id: String,
///     name: String,
/// }
///
/// impl DocumentObject for Person {
///     fn document_key(&self) -> String {
///         self.id.clone()
///     }
///
///     fn to_record(&self) -> Record {
///         let mut record = Record::new();
///         record.insert("name".to_string(), Value::from(self.name.as_str()));
///         record
///     }
///
///     fn from_record(key: &str, record: Record, _store: StoreHandle) -> StorageResult<Self> {
///         let name = record
///             .get("name")
///             .and_then(Value::as_text)
///             .unwrap_or_default()
///             .to_string();
///         Ok(Person { id: key.to_string(), name })
///     }
/// }
///
/// let store = SqliteDocumentStore::in_memory().unwrap();
/// store.save_object(&Person { id: "p1".into(), name: "Ann".into() }).unwrap();
///
/// let person: Person = store.load_object("p1").unwrap().unwrap();
/// assert_eq!(person.name, "Ann");
/// assert_eq!(Person::class_name(), "Person");
/// ```
pub trait DocumentObject: Sized {
    /// Class tag stored with every document of this type.
    ///
    /// Defaults to the unqualified type name.
    fn class_name() -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Key under which this object is stored.
    fn document_key(&self) -> String;

    /// Converts the object into a record.
    fn to_record(&self) -> Record;

    /// Rebuilds an object from a stored record.
    fn from_record(key: &str, record: Record, store: StoreHandle) -> StorageResult<Self>;

    /// Key path, relative to the record root, below which sort descriptors
    /// are resolved. Empty means the record root.
    fn sort_root() -> &'static str {
        ""
    }
}
