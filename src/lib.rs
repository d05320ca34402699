mod admin;
mod assignment;
mod config;
mod error;
mod registry;
mod sharder;

pub use admin::Admin;
pub use assignment::{
    placeholder_name, Assignment, AssignmentStore, InMemoryAssignmentStore, StoreError,
    PLACEHOLDER_PREFIX,
};
#[cfg(feature = "sqlite")]
pub use assignment::{SqliteAssignmentStore, SqliteStoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
pub use config::{DatabaseSection, ShardConfig, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, ShardError};
pub use registry::{Bucket, BucketRegistry};
pub use sharder::{
    BucketLoad, LoadReport, LoadTable, Sharder, SharderOptions, MAX_ASSIGN_ATTEMPTS,
};
