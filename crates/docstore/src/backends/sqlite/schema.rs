//! SQLite schema definitions and the persisted datatype registry.

use rusqlite::{Connection, OptionalExtension};

use crate::document::codec::{Datatype, FORMAT_VERSION};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::search::DatatypeRegistry;

/// Current schema version. Tracks the path encoding and datatype tags.
pub const SCHEMA_VERSION: i32 = FORMAT_VERSION;

fn migration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}

/// Initialize the database schema.
///
/// Fails with [`BackendError::UnsupportedFormat`] when the file was written by
/// a newer format.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::Backend(BackendError::UnsupportedFormat {
            found: current_version,
            supported: SCHEMA_VERSION,
        }));
    }

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::info!("Created document store schema version {}", SCHEMA_VERSION);
    } else {
        tracing::debug!("Document store schema version {} is current", current_version);
    }

    Ok(())
}

/// Get the current schema version, or 0 for a fresh database.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Create version 1 of the schema.
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS doc_keys (
            doc_key TEXT PRIMARY KEY NOT NULL,
            snapshot BLOB NOT NULL,
            class_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_doc_keys_class ON doc_keys(class_name);
        CREATE INDEX IF NOT EXISTS idx_doc_keys_created ON doc_keys(created_at);

        -- The value column is declared without a type so stored text and
        -- blobs keep their storage class.
        CREATE TABLE IF NOT EXISTS doc_values (
            doc_key TEXT NOT NULL REFERENCES doc_keys(doc_key) ON DELETE CASCADE,
            attribute TEXT NOT NULL,
            value,
            datatype TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_doc_values_key ON doc_values(doc_key);
        CREATE INDEX IF NOT EXISTS idx_doc_values_attr_value ON doc_values(attribute, value);
        CREATE INDEX IF NOT EXISTS idx_doc_values_value ON doc_values(value);

        CREATE TABLE IF NOT EXISTS attribute_datatypes (
            attribute TEXT NOT NULL,
            datatype TEXT NOT NULL,
            PRIMARY KEY (attribute, datatype)
        );
        ",
    )
    .map_err(|e| migration_error(format!("Failed to create schema v1: {}", e)))?;

    Ok(())
}

/// Loads the persisted datatype registry.
///
/// Unknown tags are skipped with a warning.
pub fn load_registry(conn: &Connection) -> StorageResult<DatatypeRegistry> {
    let mut registry = DatatypeRegistry::new();
    let mut stmt = conn.prepare("SELECT attribute, datatype FROM attribute_datatypes")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    for row in rows {
        let (attribute, tag) = row?;
        match tag.parse::<Datatype>() {
            Ok(datatype) => {
                registry.register(attribute, datatype);
            }
            Err(_) => {
                tracing::warn!("Skipping unknown datatype tag '{}' for '{}'", tag, attribute);
            }
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initialization() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        for table in ["attribute_datatypes", "doc_keys", "doc_values", "schema_version"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[test]
    fn test_schema_initialization_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_format_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_registry() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO attribute_datatypes VALUES ('Salary', 'NUMBER');
             INSERT INTO attribute_datatypes VALUES ('Salary', 'BOGUS');",
        )
        .unwrap();

        let registry = load_registry(&conn).unwrap();
        assert_eq!(registry.sole_datatype("Salary"), Some(Datatype::Number));
    }
}
