//! Search provider trait.
//!
//! Structured searches, raw SQL and aggregates all go through
//! [`SearchProvider`]. A failed query returns an error and never a partial
//! result.

use crate::error::StorageResult;
use crate::types::{
    AggregateFunction, DocumentSet, RawResult, ReturnShape, Search, SearchResults,
};

use super::storage::DocumentStorage;

/// Query operations over stored documents.
pub trait SearchProvider: DocumentStorage {
    /// Runs a structured search returning documents.
    fn search_documents(&self, search: &Search) -> StorageResult<DocumentSet>;

    /// Runs a structured search returning keys.
    ///
    /// Sort descriptors are ignored for this shape.
    fn search_keys(&self, search: &Search) -> StorageResult<Vec<String>>;

    /// Runs a structured search in the requested shape.
    fn search(&self, search: &Search, shape: ReturnShape) -> StorageResult<SearchResults> {
        match shape {
            ReturnShape::Records => self.search_documents(search).map(SearchResults::Documents),
            ReturnShape::Keys => self.search_keys(search).map(SearchResults::Keys),
        }
    }

    /// Executes a statement verbatim and returns its rows as text.
    fn execute_raw(&self, sql: &str) -> StorageResult<RawResult>;

    /// Executes a `SELECT`, rewriting its column list to produce the
    /// requested shape.
    ///
    /// # Errors
    ///
    /// Statements that cannot be rewritten safely fail with
    /// [`QueryError::MalformedQuery`](crate::error::QueryError::MalformedQuery)
    /// before reaching the database.
    fn execute_raw_as(&self, sql: &str, shape: ReturnShape) -> StorageResult<SearchResults>;

    /// Computes an aggregate over the values stored under `attribute` in the
    /// documents matched by `search`.
    ///
    /// Returns `None` when there is nothing to aggregate (for instance the
    /// average of no rows). Everything except `Count` only considers numeric
    /// values.
    fn aggregate(
        &self,
        function: AggregateFunction,
        attribute: &str,
        search: &Search,
    ) -> StorageResult<Option<f64>>;

    /// Returns the query plan of a statement.
    fn explain(&self, sql: &str) -> StorageResult<RawResult>;
}
