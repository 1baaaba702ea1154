//! Core storage traits.
//!
//! - [`DocumentStorage`] - Keyed save, load and remove of records
//! - [`SearchProvider`] - Structured search, raw SQL and aggregates
//! - [`TransactionProvider`] - Explicit transactions
//! - [`DocumentObject`] - Adapter for storing application types
//!
//! # Trait Hierarchy
//!
//! ```text
//! DocumentStorage
//!     └── SearchProvider
//!
//! TransactionProvider
//! ```
//!
//! # Example
//!
//! ```
//! use helios_docstore::backends::sqlite::SqliteDocumentStore;
//! use helios_docstore::core::{DocumentStorage, SearchProvider, TransactionProvider};
//! use helios_docstore::types::{record_from_json, ReturnShape, Search};
//! use serde_json::json;
//!
//! let store = SqliteDocumentStore::in_memory().unwrap();
//!
//! store
//!     .in_transaction(|store| {
//!         store.save("a", &record_from_json(json!({"City": "Madrid"}))?)?;
//!         store.save("b", &record_from_json(json!({"City": "Lisbon"}))?)
//!     })
//!     .unwrap();
//!
//! let search = Search::new().with_attribute("City").with_value("Madrid");
//! let keys = store.search(&search, ReturnShape::Keys).unwrap().into_keys();
//! assert_eq!(keys, vec!["a".to_string()]);
//! ```

mod object;
mod search;
mod storage;
mod transaction;

pub use object::DocumentObject;
pub use search::SearchProvider;
pub use storage::DocumentStorage;
pub use transaction::TransactionProvider;
