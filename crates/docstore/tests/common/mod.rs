//! Test infrastructure for the document store.
//!
//! This module provides store constructors, record fixtures and assertion
//! helpers shared by the integration suites.

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;
