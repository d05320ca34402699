//! Sharder - least-loaded, weighted, sticky bucket assignment.
//!
//! ## Example
//!
//! ```
//! use sharder::{BucketRegistry, InMemoryAssignmentStore, Sharder};
//!
//! let registry = BucketRegistry::from_names(["hub-1", "hub-2"])?;
//! let sharder = Sharder::open("hub", registry, InMemoryAssignmentStore::new())?;
//!
//! let bucket = sharder.assign("alice")?;
//! assert_eq!(sharder.assign("alice")?, bucket);
//! # Ok::<(), sharder::ShardError>(())
//! ```

mod load;

use tracing::{debug, info, warn};

use crate::assignment::{placeholder_name, AssignmentStore};
use crate::{BucketRegistry, ConfigError, ShardError};

pub use load::{BucketLoad, LoadReport, LoadTable};

/// How many times `assign` re-reads after losing an insert race.
pub const MAX_ASSIGN_ATTEMPTS: usize = 5;

/// Options for [`Sharder::open_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SharderOptions {
    /// Seed one `dummy-<bucket>` row per configured bucket on open.
    ///
    /// Only needed when the table is shared with older deployments that
    /// count buckets through those rows. Load computation does not rely on
    /// them.
    pub seed_placeholders: bool,
}

/// Assigns identifiers of one kind to buckets.
///
/// Holds no state beyond its kind, the registry handle and the store handle:
/// every decision re-reads both, so several sharders (in this process or
/// others) can work against one store.
pub struct Sharder<S> {
    kind: String,
    registry: BucketRegistry,
    store: S,
}

impl<S: AssignmentStore> Sharder<S> {
    /// Prepare the store and return a sharder for `kind`.
    pub fn open(
        kind: impl Into<String>,
        registry: BucketRegistry,
        store: S,
    ) -> Result<Self, ShardError> {
        Self::open_with(kind, registry, store, SharderOptions::default())
    }

    /// Like [`open`](Self::open), with options. Safe to repeat against the same store.
    pub fn open_with(
        kind: impl Into<String>,
        registry: BucketRegistry,
        store: S,
        options: SharderOptions,
    ) -> Result<Self, ShardError> {
        if registry.is_empty() {
            return Err(ConfigError::EmptyRegistry.into());
        }
        store.ensure_schema()?;

        let sharder = Sharder {
            kind: kind.into(),
            registry,
            store,
        };
        if options.seed_placeholders {
            sharder.seed_placeholders()?;
        }
        Ok(sharder)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn registry(&self) -> &BucketRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the bucket for `name`, assigning the least loaded one first if needed.
    ///
    /// Once an assignment exists it is returned unchanged by every later
    /// call, whatever the current weighting.
    pub fn assign(&self, name: &str) -> Result<String, ShardError> {
        for attempt in 1..=MAX_ASSIGN_ATTEMPTS {
            if let Some(existing) = self.store.find_assignment(&self.kind, name)? {
                info!(kind = %self.kind, name, bucket = %existing.bucket, "found existing assignment");
                return Ok(existing.bucket);
            }

            let table = self.load_table()?;
            let bucket = table
                .least_loaded()
                .map(|entry| entry.bucket.clone())
                .ok_or(ConfigError::EmptyRegistry)?;

            match self.store.insert_assignment(&self.kind, &bucket, name) {
                Ok(_) => {
                    info!(kind = %self.kind, name, bucket = %bucket, effective = %table, "assigned");
                    return Ok(bucket);
                }
                Err(err) if err.is_duplicate_key() => {
                    warn!(kind = %self.kind, name, attempt, "lost insert race, re-reading");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShardError::Contended {
            name: name.to_string(),
            attempts: MAX_ASSIGN_ATTEMPTS,
        })
    }

    /// The existing bucket for `name`, without assigning one.
    pub fn lookup(&self, name: &str) -> Result<Option<String>, ShardError> {
        Ok(self
            .store
            .find_assignment(&self.kind, name)?
            .map(|assignment| assignment.bucket))
    }

    /// Current effective load of every configured bucket.
    pub fn load_table(&self) -> Result<LoadTable, ShardError> {
        let counts = self.store.count_by_bucket(&self.kind)?;
        Ok(LoadTable::from_counts(&self.registry.snapshot(), &counts))
    }

    /// Raw, extra and effective totals per bucket.
    pub fn report(&self) -> Result<LoadReport, ShardError> {
        let counts = self.store.count_by_bucket(&self.kind)?;
        Ok(LoadReport::new(&self.kind, &self.registry.snapshot(), &counts))
    }

    fn seed_placeholders(&self) -> Result<(), ShardError> {
        for bucket in self.registry.snapshot() {
            let name = placeholder_name(&bucket.name);
            if self.store.find_assignment(&self.kind, &name)?.is_some() {
                continue;
            }
            match self.store.insert_assignment(&self.kind, &bucket.name, &name) {
                Ok(_) => debug!(kind = %self.kind, bucket = %bucket.name, "seeded placeholder"),
                // Another process seeded it first.
                Err(err) if err.is_duplicate_key() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}
