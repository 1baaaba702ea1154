//! Helios Document Store
//!
//! This crate provides a schema-less document store layered on SQLite.
//! Arbitrary nested records are saved under a unique key, flattened into a
//! key/attribute/value table, and rebuilt exactly on read.
//!
//! # Features
//!
//! - **Exact round trips**: text, numbers, dates, blobs and nested
//!   mappings or sequences come back with their original types and order
//! - **Structured search**: key/attribute/value predicates, boolean
//!   expression chains, grouping, sorting and pagination, compiled to
//!   parameterized SQL
//! - **Raw SQL**: verbatim statements, or `SELECT`s rewritten to return keys or records
//! - **Aggregates**: count, average, minimum, maximum and sum over an attribute
//! - **Transactions**: atomic batches and explicit transactions
//!
//! # Architecture
//!
//! - [`types`] - Values, records, search parameters and results
//! - [`document`] - Flattening and inflating records
//! - [`search`] - Datatype registry and host-side sorting
//! - [`error`] - Error types for all operations
//! - [`core`] - Storage traits
//! - [`backends`] - The SQLite implementation
//! - [`config`] - Store configuration
//!
//! # Quick Start
//!
//! ```
//! use helios_docstore::backends::sqlite::SqliteDocumentStore;
//! use helios_docstore::core::{DocumentStorage, SearchProvider};
//! use helios_docstore::types::{record_from_json, ReturnShape, Search, Value};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteDocumentStore::in_memory()?;
//!
//! let record = record_from_json(json!({
//!     "Name": "Ann",
//!     "Addresses": [{"City": "Madrid", "Country": "Spain"}]
//! }))?;
//! store.save("ann", &record)?;
//!
//! assert_eq!(store.load("ann")?, record);
//!
//! let search = Search::new()
//!     .with_attribute("Addresses.0.City")
//!     .with_value("Madrid");
//! let found = store.search(&search, ReturnShape::Records)?.into_documents().unwrap();
//! assert_eq!(found.get("ann").unwrap().get("Name"), Some(&Value::from("Ann")));
//! # Ok(())
//! # }
//! ```
//!
//! # Expressions
//!
//! Predicates joined left to right with AND/OR; each expression is matched
//! against its own attribute/value row, and several expressions must all
//! match.
//!
//! ```
//! use helios_docstore::types::{Column, Expression, MatchType, Predicate, Search};
//!
//! let city = Expression::new(Predicate::equal(Column::Attribute, "City").unwrap())
//!     .and(Predicate::new(Column::Value, MatchType::InsensitiveEqualTo, "madrid").unwrap());
//! let country = Expression::new(Predicate::equal(Column::Attribute, "Country").unwrap())
//!     .and(Predicate::equal(Column::Value, "Spain").unwrap());
//!
//! let search = Search::new().with_expressions(&[city, country]).with_limit(10);
//! assert_eq!(search.expressions().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod document;
pub mod error;
pub mod search;
pub mod types;

// Re-export commonly used types at crate root
pub use backends::sqlite::{SqliteDocumentStore, StoreHandle};
pub use config::StoreConfig;
pub use error::{StorageError, StorageResult};
