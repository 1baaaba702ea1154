//! Backend-independent search support.
//!
//! - [`DatatypeRegistry`] - Cache of the datatypes observed per attribute
//! - [`sort`] - Host-side sorting and pagination of materialized documents

mod registry;
pub mod sort;

pub use registry::DatatypeRegistry;
