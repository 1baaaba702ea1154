//! Test fixtures for document store testing.
//!
//! This module provides store constructors and predefined records, along with
//! a builder for employee records used across the search suites.

use serde_json::{json, Value as Json};

use helios_docstore::backends::sqlite::SqliteDocumentStore;
use helios_docstore::core::DocumentStorage;
use helios_docstore::types::{record_from_json, Record, StoredDocument};

/// Creates an in-memory store.
pub fn create_store() -> SqliteDocumentStore {
    SqliteDocumentStore::in_memory().expect("Failed to create in-memory store")
}

/// Converts JSON into a record, panicking on unsupported values.
pub fn record(json: Json) -> Record {
    record_from_json(json).expect("fixture JSON must be storable")
}

/// An employee record fixture.
#[derive(Debug, Clone)]
pub struct EmployeeFixture {
    /// Document key.
    pub key: String,
    /// Employee name.
    pub name: String,
    /// Yearly salary.
    pub salary: i64,
    /// City of the first address.
    pub city: String,
    /// Country of the first address.
    pub country: String,
}

impl EmployeeFixture {
    /// Creates an employee fixture.
    pub fn new(key: impl Into<String>, name: impl Into<String>, salary: i64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            salary,
            city: "Madrid".to_string(),
            country: "Spain".to_string(),
        }
    }

    /// Sets the address.
    pub fn living_in(mut self, city: impl Into<String>, country: impl Into<String>) -> Self {
        self.city = city.into();
        self.country = country.into();
        self
    }

    /// Builds the flat record form with `City` and `Country` at the root.
    pub fn flat_record(&self) -> Record {
        record(json!({
            "Name": self.name,
            "Salary": self.salary,
            "City": self.city,
            "Country": self.country
        }))
    }

    /// Builds the nested record form.
    pub fn nested_record(&self) -> Record {
        record(json!({
            "Name": self.name,
            "Salary": self.salary,
            "Addresses": [{"City": self.city, "Country": self.country}]
        }))
    }

    /// Builds a stored document with the flat record form.
    pub fn document(&self) -> StoredDocument {
        StoredDocument::new(self.key.clone(), "Employee", self.flat_record())
    }
}

/// Saves a standard set of employees in one batch.
///
/// | key | name | salary | city | country |
/// |-----|------|--------|------|---------|
/// | e1 | Ann | 10 | Madrid | Spain |
/// | e2 | Bob | 20 | Barcelona | Spain |
/// | e3 | Cid | 30 | Madrid | Spain |
/// | e4 | Dee | 40 | Paris | France |
/// | e5 | Eve | 50 | Madrid | Mexico |
pub fn seed_employees(store: &SqliteDocumentStore) -> Vec<EmployeeFixture> {
    let employees = vec![
        EmployeeFixture::new("e1", "Ann", 10),
        EmployeeFixture::new("e2", "Bob", 20).living_in("Barcelona", "Spain"),
        EmployeeFixture::new("e3", "Cid", 30),
        EmployeeFixture::new("e4", "Dee", 40).living_in("Paris", "France"),
        EmployeeFixture::new("e5", "Eve", 50).living_in("Madrid", "Mexico"),
    ];
    let documents: Vec<_> = employees.iter().map(EmployeeFixture::document).collect();
    store
        .save_batch(&documents)
        .expect("Failed to seed employees");
    employees
}
