//! Error types for the document store.
//!
//! This module defines all error types used throughout the store, following a
//! hierarchy that separates value encoding errors, document shape errors,
//! query construction errors, transaction errors and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Value encoding errors
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Document shape and lookup errors
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Predicate, expression and raw SQL errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Transaction errors
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StorageError {
    /// Returns true if this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Document(DocumentError::NotFound { .. }))
    }
}

/// Errors raised while converting values to their stored representation.
#[derive(Error, Debug)]
pub enum ValueError {
    /// The value cannot be represented by any storable datatype.
    #[error("unsupported value type '{found}' at '{path}'")]
    UnsupportedValueType { path: String, found: String },

    /// A stored value could not be decoded back into its datatype.
    #[error("cannot decode {datatype} value '{raw}'")]
    Undecodable { datatype: String, raw: String },
}

/// Errors related to stored documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The requested key does not exist.
    #[error("document not found: {key}")]
    NotFound { key: String },

    /// The stored attribute paths of a key cannot be rebuilt into a record.
    #[error("inconsistent path set for {key} at '{path}': {message}")]
    InconsistentPathSet {
        key: String,
        path: String,
        message: String,
    },

    /// Document keys must be non-empty.
    #[error("invalid document key: {message}")]
    InvalidKey { message: String },
}

/// Errors related to query construction.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A predicate or expression was built from invalid parts.
    #[error("invalid predicate: {message}")]
    InvalidPredicate { message: String },

    /// A caller-supplied SQL statement cannot be safely rewritten.
    #[error("malformed query: {message}")]
    MalformedQuery { sql: String, message: String },
}

/// Errors related to transactions.
#[derive(Error, Debug)]
pub enum TransactionError {
    /// A transaction is already active on this store.
    #[error("nested transactions not supported")]
    NestedNotSupported,

    /// Commit or rollback was requested without an active transaction.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// The transaction was rolled back.
    #[error("transaction rolled back: {reason}")]
    RolledBack { reason: String },
}

/// Errors originating from the database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Opening the database failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// The database was written by a newer, incompatible format.
    #[error("unsupported storage format version {found} (supported up to {supported})")]
    UnsupportedFormat { found: i32, supported: i32 },

    /// Internal backend error, carrying the backend's own diagnostic.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result type alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "io".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.into())
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(BackendError::Internal {
            backend_name: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Document(DocumentError::NotFound {
            key: "abc-123".to_string(),
        });
        assert_eq!(err.to_string(), "document not found: abc-123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_inconsistent_path_set_display() {
        let err = DocumentError::InconsistentPathSet {
            key: "k1".to_string(),
            path: "a.name".to_string(),
            message: "expected a sequence index".to_string(),
        };
        assert!(err.to_string().contains("a.name"));
        assert!(err.to_string().contains("k1"));
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::MalformedQuery {
            sql: "DELETE FROM doc_keys".to_string(),
            message: "not a SELECT statement".to_string(),
        };
        assert_eq!(err.to_string(), "malformed query: not a SELECT statement");
    }

    #[test]
    fn test_storage_error_from_categories() {
        let err: StorageError = ValueError::UnsupportedValueType {
            path: "a".to_string(),
            found: "null".to_string(),
        }
        .into();
        assert!(matches!(err, StorageError::Value(_)));
        assert!(!err.is_not_found());

        let err: StorageError = TransactionError::NestedNotSupported.into();
        assert!(matches!(err, StorageError::Transaction(_)));
    }

    #[test]
    fn test_sqlite_error_is_backend_failure() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        match err {
            StorageError::Backend(BackendError::Internal { backend_name, .. }) => {
                assert_eq!(backend_name, "sqlite");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
