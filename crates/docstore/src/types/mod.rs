//! Core types for the document store.
//!
//! - [`Value`], [`Record`] - The closed value model
//! - [`StoredDocument`] - A record with its key, class tag and creation time
//! - [`Predicate`], [`Expression`], [`Search`] - Structured queries
//! - [`SearchResults`], [`DocumentSet`], [`RawResult`] - Query results
//!
//! # Examples
//!
//! ```
//! use helios_docstore::types::{record_from_json, Value};
//! use serde_json::json;
//!
//! let record = record_from_json(json!({
//!     "Name": "Ann",
//!     "Salary": 20,
//!     "Addresses": [{"City": "Madrid"}]
//! }))
//! .unwrap();
//!
//! assert_eq!(record["Salary"], Value::from(20));
//! ```

mod results;
mod search_params;
mod stored_document;
mod value;

pub use results::{DocumentSet, RawResult, SearchResults};

pub use search_params::{
    AggregateFunction, Column, Connective, DateMatch, Expression, MatchType, Predicate,
    ReturnShape, Search, SortDescriptor,
};

pub use stored_document::StoredDocument;

pub use value::{record_from_json, record_to_json, Number, Record, Value};
