//! Store configuration.
//!
//! [`StoreConfig`] can be built in code or deserialized from any serde
//! format. Durations are written in humantime form (`"5s"`, `"250ms"`).
//!
//! ```
//! use helios_docstore::StoreConfig;
//!
//! let config: StoreConfig = serde_json::from_str(r#"{ "busy_timeout": "2s" }"#).unwrap();
//! assert_eq!(config.busy_timeout, std::time::Duration::from_secs(2));
//! assert!(config.enable_foreign_keys);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a SQLite document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long SQLite retries a locked database before failing.
    #[serde(with = "humantime_serde", default = "default_busy_timeout")]
    pub busy_timeout: Duration,

    /// Enable WAL journaling for file databases.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key enforcement between `doc_values` and `doc_keys`.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,

    /// Class tag stored for documents saved without one.
    #[serde(default = "default_class_name")]
    pub default_class_name: String,

    /// Number of keys per `IN (...)` list when bulk-loading values.
    #[serde(default = "default_bulk_load_chunk_size")]
    pub bulk_load_chunk_size: usize,
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_class_name() -> String {
    "Dictionary".to_string()
}

fn default_bulk_load_chunk_size() -> usize {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: default_busy_timeout(),
            enable_wal: true,
            enable_foreign_keys: true,
            default_class_name: default_class_name(),
            bulk_load_chunk_size: default_bulk_load_chunk_size(),
        }
    }
}

impl StoreConfig {
    /// Sets the busy timeout.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enables or disables WAL journaling.
    pub fn with_wal(mut self, enable: bool) -> Self {
        self.enable_wal = enable;
        self
    }

    /// Sets the default class tag.
    pub fn with_default_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.default_class_name = class_name.into();
        self
    }

    /// Sets the bulk-load chunk size. Zero is treated as one.
    pub fn with_bulk_load_chunk_size(mut self, size: usize) -> Self {
        self.bulk_load_chunk_size = size.max(1);
        self
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
