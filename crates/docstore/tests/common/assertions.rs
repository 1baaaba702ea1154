//! Assertion helpers for document store tests.

use helios_docstore::error::{DocumentError, QueryError, StorageError, TransactionError};
use helios_docstore::types::SearchResults;

/// Asserts that a key list equals `expected`, in order.
pub fn assert_keys(actual: &[String], expected: &[&str]) {
    let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    assert_eq!(actual, expected, "Key mismatch");
}

/// Asserts that results hold exactly `expected` keys, ignoring order.
pub fn assert_key_set(results: &SearchResults, expected: &[&str]) {
    let mut actual = results.keys();
    actual.sort_unstable();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(actual, expected, "Key set mismatch");
}

/// Asserts that an error is a not-found error.
pub fn assert_not_found(err: &StorageError) {
    assert!(
        matches!(err, StorageError::Document(DocumentError::NotFound { .. })),
        "Expected NotFound error, got: {:?}",
        err
    );
}

/// Asserts that an error is a malformed-query error.
pub fn assert_malformed(err: &StorageError) {
    assert!(
        matches!(err, StorageError::Query(QueryError::MalformedQuery { .. })),
        "Expected MalformedQuery error, got: {:?}",
        err
    );
}

/// Asserts that an error is a transaction error.
pub fn assert_transaction_error(err: &StorageError) {
    assert!(
        matches!(err, StorageError::Transaction(TransactionError::NestedNotSupported)
            | StorageError::Transaction(TransactionError::NoActiveTransaction)),
        "Expected transaction error, got: {:?}",
        err
    );
}
