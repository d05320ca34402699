//! Assignments - the persisted `(kind, bucket, name)` facts.
//!
//! An [`AssignmentStore`] holds one row per `(kind, name)` pair and enforces
//! that uniqueness itself. The sharding engine only ever inserts; the
//! administration client may move or delete rows behind its back.
//!
//! ## Example
//!
//! ```
//! use sharder::{AssignmentStore, InMemoryAssignmentStore};
//!
//! let store = InMemoryAssignmentStore::new();
//! store.insert_assignment("hub", "hub-1", "alice")?;
//! let found = store.find_assignment("hub", "alice")?.unwrap();
//! assert_eq!(found.bucket, "hub-1");
//! # Ok::<(), sharder::StoreError>(())
//! ```

mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of the synthetic rows older deployments keep in every bucket.
pub const PLACEHOLDER_PREFIX: &str = "dummy-";

/// One persisted assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub kind: String,
    pub bucket: String,
    pub name: String,
}

impl Assignment {
    /// Whether this row is the bootstrap placeholder of its own bucket.
    pub fn is_placeholder(&self) -> bool {
        self.name == placeholder_name(&self.bucket)
    }
}

/// Identifier of the placeholder row for `bucket`.
pub fn placeholder_name(bucket: &str) -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, bucket)
}

/// Error type for assignment store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `(kind, name)` pair already has a row.
    #[error("{kind}:{name} is already assigned")]
    DuplicateKey { kind: String, name: String },
    /// An in-process lock was poisoned by a panicking writer.
    #[error("assignment store lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// Storage-level error from the backend.
    #[error("assignment store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

pub use in_memory::InMemoryAssignmentStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteAssignmentStore, SqliteStoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
pub use store::AssignmentStore;
