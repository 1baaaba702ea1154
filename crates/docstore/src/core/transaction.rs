//! Transaction trait.
//!
//! A store runs at most one explicit transaction at a time. Writes issued
//! while it is open join it through a savepoint and become durable on commit.

use crate::error::StorageResult;

/// Explicit transaction control.
pub trait TransactionProvider {
    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Fails with
    /// [`TransactionError::NestedNotSupported`](crate::error::TransactionError::NestedNotSupported)
    /// if one is already active.
    fn begin_transaction(&self) -> StorageResult<()>;

    /// Commits the active transaction.
    fn commit_transaction(&self) -> StorageResult<()>;

    /// Rolls back the active transaction.
    fn rollback_transaction(&self) -> StorageResult<()>;

    /// Returns true while a transaction is open.
    fn is_transaction_active(&self) -> bool;

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on
    /// `Err`.
    fn in_transaction<T, F>(&self, f: F) -> StorageResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> StorageResult<T>,
    {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit_transaction()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback_transaction() {
                    tracing::warn!("rollback after failed transaction body failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
