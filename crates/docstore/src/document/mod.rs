//! Document flattening and the stored value format.
//!
//! - [`codec`] - Atomic values to stored text/blob plus a datatype tag
//! - [`path`] - Escaped, dot-joined attribute paths
//! - [`flatten`] - Records to attribute triples and back

pub mod codec;
pub mod flatten;
pub mod path;

pub use codec::{Datatype, FORMAT_VERSION, StoredValue};
pub use flatten::{flatten, inflate, project, Triple};
