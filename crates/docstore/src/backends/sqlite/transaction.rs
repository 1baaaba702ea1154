//! Transaction support for the SQLite document store.
//!
//! Internal writes always run in a write scope: a `BEGIN IMMEDIATE`
//! transaction when the connection is in autocommit mode, or a savepoint
//! inside the caller's explicit transaction otherwise.

use rusqlite::Connection;

use crate::core::TransactionProvider;
use crate::error::{StorageError, StorageResult, TransactionError};

use super::SqliteDocumentStore;

const WRITE_SAVEPOINT: &str = "docstore_write";

fn begin_failed(e: rusqlite::Error) -> StorageError {
    StorageError::Transaction(TransactionError::RolledBack {
        reason: format!("Failed to begin transaction: {}", e),
    })
}

/// An open write scope on a connection.
struct WriteScope<'c> {
    conn: &'c Connection,
    nested: bool,
}

impl<'c> WriteScope<'c> {
    fn begin(conn: &'c Connection) -> StorageResult<Self> {
        let nested = !conn.is_autocommit();
        if nested {
            conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT}"))
        } else {
            conn.execute_batch("BEGIN IMMEDIATE")
        }
        .map_err(begin_failed)?;
        Ok(Self { conn, nested })
    }

    fn commit(self) -> StorageResult<()> {
        let sql = if self.nested {
            format!("RELEASE {WRITE_SAVEPOINT}")
        } else {
            "COMMIT".to_string()
        };
        if let Err(e) = self.conn.execute_batch(&sql) {
            self.rollback();
            return Err(e.into());
        }
        Ok(())
    }

    fn rollback(self) {
        let sql = if self.nested {
            format!("ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT}")
        } else {
            "ROLLBACK".to_string()
        };
        if let Err(e) = self.conn.execute_batch(&sql) {
            tracing::warn!("Failed to roll back write: {}", e);
        }
    }
}

/// Runs `f` in a write scope, committing on `Ok` and rolling back on `Err`.
pub(crate) fn with_write<T, F>(conn: &Connection, f: F) -> StorageResult<T>
where
    F: FnOnce(&Connection) -> StorageResult<T>,
{
    let scope = WriteScope::begin(conn)?;
    match f(conn) {
        Ok(value) => {
            scope.commit()?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!("Rolling back write: {}", err);
            scope.rollback();
            Err(err)
        }
    }
}

impl TransactionProvider for SqliteDocumentStore {
    fn begin_transaction(&self) -> StorageResult<()> {
        let conn = self.connection();
        if !conn.is_autocommit() {
            return Err(TransactionError::NestedNotSupported.into());
        }
        conn.execute_batch("BEGIN IMMEDIATE").map_err(begin_failed)?;
        tracing::debug!("Began transaction on store {}", self.id());
        Ok(())
    }

    fn commit_transaction(&self) -> StorageResult<()> {
        let conn = self.connection();
        if conn.is_autocommit() {
            return Err(TransactionError::NoActiveTransaction.into());
        }
        conn.execute_batch("COMMIT")?;
        tracing::debug!("Committed transaction on store {}", self.id());
        Ok(())
    }

    fn rollback_transaction(&self) -> StorageResult<()> {
        let conn = self.connection();
        if conn.is_autocommit() {
            return Err(TransactionError::NoActiveTransaction.into());
        }
        conn.execute_batch("ROLLBACK")?;
        tracing::warn!("Rolled back transaction on store {}", self.id());
        self.reload_registry_locked(&conn)
    }

    fn is_transaction_active(&self) -> bool {
        !self.connection().is_autocommit()
    }
}
