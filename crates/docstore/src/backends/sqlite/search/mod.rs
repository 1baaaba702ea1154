//! SQLite search implementation.
//!
//! - Query builder translating structured searches and aggregates to SQL
//! - Raw SQL column-list rewriting for shaped raw queries

pub mod query_builder;
pub mod rewrite;

pub use query_builder::{QueryBuilder, SqlFragment, SqlParam};
pub use rewrite::rewrite_select;
