//! SQLite document store.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};
use rusqlite::Connection;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{BackendError, StorageError, StorageResult};
use crate::search::DatatypeRegistry;

use super::schema;

pub(crate) const BACKEND_NAME: &str = "sqlite";

fn internal_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}

/// State shared by every clone of a store.
pub(crate) struct StoreInner {
    id: Uuid,
    pub(crate) conn: Mutex<Connection>,
    pub(crate) config: StoreConfig,
    /// In-memory cache of `attribute_datatypes`. Always locked after `conn`.
    pub(crate) registry: RwLock<DatatypeRegistry>,
    is_memory: bool,
    path: Option<PathBuf>,
}

/// A schema-less document store backed by a single SQLite connection.
///
/// Cloning is cheap and every clone refers to the same database. All calls
/// run synchronously on the calling thread.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl Debug for SqliteDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDocumentStore")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path)
            .field("is_memory", &self.inner.is_memory)
            .field("registry_len", &self.inner.registry.read().len())
            .finish_non_exhaustive()
    }
}

impl SqliteDocumentStore {
    /// Creates a new in-memory store.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", StoreConfig::default())
    }

    /// Opens or creates a file-backed store.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, StoreConfig::default())
    }

    /// Opens a store with custom configuration.
    ///
    /// # Errors
    ///
    /// Fails with [`BackendError::UnsupportedFormat`] if the file was written
    /// by a newer version of the store.
    pub fn with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> StorageResult<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str == ":memory:";

        let conn = if is_memory {
            Connection::open_in_memory()
        } else {
            Connection::open(path.as_ref())
        }
        .map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
        })?;

        configure_connection(&conn, &config, is_memory)?;
        schema::initialize_schema(&conn)?;
        let registry = schema::load_registry(&conn)?;

        let store = Self {
            inner: Arc::new(StoreInner {
                id: Uuid::new_v4(),
                conn: Mutex::new(conn),
                config,
                registry: RwLock::new(registry),
                is_memory,
                path: (!is_memory).then(|| path.as_ref().to_path_buf()),
            }),
        };

        tracing::info!(
            "Opened document store {} at {} ({} registered attributes)",
            store.inner.id,
            path_str,
            store.inner.registry.read().len()
        );

        Ok(store)
    }

    /// Unique identity of this store instance.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.inner.is_memory
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Returns a non-owning handle to this store.
    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Snapshot of the datatype registry cache.
    pub fn registry(&self) -> DatatypeRegistry {
        self.inner.registry.read().clone()
    }

    /// Rebuilds the datatype registry cache from disk.
    pub fn reload_registry(&self) -> StorageResult<()> {
        let conn = self.connection();
        self.reload_registry_locked(&conn)
    }

    pub(crate) fn reload_registry_locked(&self, conn: &Connection) -> StorageResult<()> {
        let registry = schema::load_registry(conn)?;
        *self.inner.registry.write() = registry;
        Ok(())
    }

    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.inner.conn.lock()
    }
}

fn configure_connection(conn: &Connection, config: &StoreConfig, is_memory: bool) -> StorageResult<()> {
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| internal_error(format!("Failed to set busy timeout: {}", e)))?;

    conn.pragma_update(None, "foreign_keys", config.enable_foreign_keys)
        .map_err(|e| internal_error(format!("Failed to configure foreign keys: {}", e)))?;

    if config.enable_wal && !is_memory {
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| internal_error(format!("Failed to enable WAL mode: {}", e)))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!("SQLite kept journal mode '{}' instead of WAL", mode);
        }
    }

    Ok(())
}

/// Non-owning back reference from loaded objects to their store.
///
/// Holding a handle does not keep the store alive; [`StoreHandle::upgrade`]
/// returns `None` once every [`SqliteDocumentStore`] clone is dropped.
#[derive(Clone)]
pub struct StoreHandle {
    id: Uuid,
    inner: Weak<StoreInner>,
}

impl StoreHandle {
    /// Returns the store if it is still open.
    pub fn upgrade(&self) -> Option<SqliteDocumentStore> {
        self.inner
            .upgrade()
            .map(|inner| SqliteDocumentStore { inner })
    }

    /// Identity of the store this handle was taken from.
    pub fn store_id(&self) -> Uuid {
        self.id
    }

    /// Returns true while the store is open.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("store_id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        assert!(store.is_memory());
        assert!(store.path().is_none());
        assert!(store.registry().is_empty());
    }

    #[test]
    fn test_file_store_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        let store = SqliteDocumentStore::open(&path).unwrap();
        assert!(!store.is_memory());
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_handle_upgrade_and_expiry() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let handle = store.handle();
        assert_eq!(handle.store_id(), store.id());
        assert!(handle.is_alive());

        let upgraded = handle.upgrade().unwrap();
        assert_eq!(upgraded.id(), store.id());
        drop(upgraded);
        drop(store);

        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_clones_share_identity() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        let clone = store.clone();
        assert_eq!(store.id(), clone.id());
    }
}
