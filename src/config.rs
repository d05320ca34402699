//! YAML configuration for the sharder and its admin tool.
//!
//! ```yaml
//! kind: hub
//! hubs:
//!   - name: hub-1
//!   - name: hub-2
//!     extra_shards: 5
//! database:
//!   path: /srv/sharder/sharder.sqlite
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sharder::SharderOptions;
use crate::{Bucket, BucketRegistry, ConfigError};

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "/srv/sharder/sharder.yml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShardConfig {
    /// Kind of identifier being sharded.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Buckets in tie-break order.
    #[serde(default)]
    pub hubs: Vec<Bucket>,
    #[serde(default)]
    pub database: DatabaseSection,
    /// Keep seeding `dummy-<bucket>` rows for older readers of the table.
    #[serde(default)]
    pub legacy_placeholders: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// `database:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/srv/sharder/sharder.sqlite"),
            busy_timeout_ms: 5_000,
        }
    }
}

fn default_kind() -> String {
    "hub".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ShardConfig {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Validated registry built from `hubs`.
    pub fn registry(&self) -> Result<BucketRegistry, ConfigError> {
        BucketRegistry::new(self.hubs.clone())
    }

    pub fn sharder_options(&self) -> SharderOptions {
        SharderOptions {
            seed_placeholders: self.legacy_placeholders,
        }
    }

    /// SQLite store described by the `database` section.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_store(&self) -> crate::SqliteAssignmentStore {
        crate::SqliteAssignmentStore::new(crate::SqliteStoreConfig {
            path: self.database.path.clone(),
            busy_timeout_ms: self.database.busy_timeout_ms,
        })
    }
}
