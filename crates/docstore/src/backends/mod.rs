//! Database backend implementations.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | SQLite | Embedded single-file or in-memory store |
//!
//! # Example
//!
//! ```no_run
//! use helios_docstore::backends::sqlite::SqliteDocumentStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // In-memory store
//! let store = SqliteDocumentStore::in_memory()?;
//!
//! // Or a file-based store
//! let store = SqliteDocumentStore::open("./data/documents.db")?;
//! # Ok(())
//! # }
//! ```

pub mod sqlite;
