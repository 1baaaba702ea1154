//! SQLite backend implementation.
//!
//! This module provides the SQLite implementation of all storage traits. It
//! supports both in-memory databases (useful for testing) and file-based
//! databases.
//!
//! # Features
//!
//! - In-memory and file-based modes
//! - Atomic single and batch saves, with savepoints inside an explicit transaction
//! - Structured search compiled to parameterized SQL
//! - Raw SQL, shaped raw SQL, aggregates and query plans
//! - Storage of application types through [`DocumentObject`](crate::core::DocumentObject)
//!
//! # Example
//!
//! ```
//! use helios_docstore::backends::sqlite::SqliteDocumentStore;
//! use helios_docstore::core::{DocumentStorage, SearchProvider};
//! use helios_docstore::types::{record_from_json, AggregateFunction, Search};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteDocumentStore::in_memory()?;
//!
//! store.save("a", &record_from_json(json!({"Salary": 10}))?)?;
//! store.save("b", &record_from_json(json!({"Salary": 30}))?)?;
//!
//! let average = store.aggregate(AggregateFunction::Average, "Salary", &Search::new())?;
//! assert_eq!(average, Some(20.0));
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! -- One row per document
//! CREATE TABLE doc_keys (
//!     doc_key TEXT PRIMARY KEY NOT NULL,
//!     snapshot BLOB NOT NULL,      -- canonical JSON of the whole record
//!     class_name TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//!
//! -- One row per leaf, plus one marker row per mapping or sequence
//! CREATE TABLE doc_values (
//!     doc_key TEXT NOT NULL REFERENCES doc_keys(doc_key) ON DELETE CASCADE,
//!     attribute TEXT NOT NULL,     -- dotted path, e.g. addresses.0.city
//!     value,
//!     datatype TEXT NOT NULL       -- TEXT, NUMBER, DATE, BLOB, MAPPING, SEQUENCE
//! );
//!
//! -- Datatypes observed per attribute path
//! CREATE TABLE attribute_datatypes (
//!     attribute TEXT NOT NULL,
//!     datatype TEXT NOT NULL,
//!     PRIMARY KEY (attribute, datatype)
//! );
//! ```

mod backend;
mod objects;
mod schema;
pub mod search;
mod search_impl;
mod storage;
mod transaction;
mod writer;

pub use backend::{SqliteDocumentStore, StoreHandle};
pub use schema::SCHEMA_VERSION;
