//! Administrative overrides that bypass least-loaded selection.
//!
//! Every operation writes straight to the store. Bucket arguments are
//! checked against the registry first; single-row operations insist on
//! exactly one matching row.

use tracing::info;

use crate::assignment::{Assignment, AssignmentStore};
use crate::sharder::LoadReport;
use crate::{BucketRegistry, ShardError};

/// Administration client for one kind of identifier.
pub struct Admin<S> {
    kind: String,
    registry: BucketRegistry,
    store: S,
}

impl<S: AssignmentStore> Admin<S> {
    pub fn new(kind: impl Into<String>, registry: BucketRegistry, store: S) -> Self {
        Admin {
            kind: kind.into(),
            registry,
            store,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Real assignments, optionally limited to one bucket. Placeholder rows are skipped.
    pub fn list_users(&self, bucket: Option<&str>) -> Result<Vec<Assignment>, ShardError> {
        let rows = self.store.list_assignments(&self.kind, bucket)?;
        Ok(rows.into_iter().filter(|row| !row.is_placeholder()).collect())
    }

    pub fn find_user(&self, name: &str) -> Result<Assignment, ShardError> {
        self.exactly_one(name)
    }

    /// Remove `name`'s assignment; its next `assign` picks a bucket afresh.
    pub fn delete_user(&self, name: &str) -> Result<Assignment, ShardError> {
        let row = self.exactly_one(name)?;
        self.store.delete_assignment(&self.kind, name)?;
        info!(kind = %self.kind, name, bucket = %row.bucket, "deleted assignment");
        Ok(row)
    }

    /// Pin `name` to `bucket` without consulting the load table.
    pub fn add_user(&self, name: &str, bucket: &str) -> Result<Assignment, ShardError> {
        self.registry.require(bucket)?;
        match self.store.insert_assignment(&self.kind, bucket, name) {
            Ok(row) => {
                info!(kind = %self.kind, name, bucket, "added assignment");
                Ok(row)
            }
            Err(err) if err.is_duplicate_key() => {
                let existing = self.exactly_one(name)?;
                Err(ShardError::AlreadyAssigned {
                    name: name.to_string(),
                    bucket: existing.bucket,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reassign an existing `name` to `bucket`. Returns the row as it was before the move.
    pub fn move_user(&self, name: &str, bucket: &str) -> Result<Assignment, ShardError> {
        let row = self.exactly_one(name)?;
        self.registry.require(bucket)?;
        self.store.move_assignment(&self.kind, name, bucket)?;
        info!(kind = %self.kind, name, from = %row.bucket, to = bucket, "moved assignment");
        Ok(row)
    }

    /// Move every real assignment on `from` to `to`. Returns how many moved.
    ///
    /// Rows are moved and committed one at a time; a failure part-way leaves
    /// the already moved rows on `to`.
    pub fn migrate_bucket(&self, from: &str, to: &str) -> Result<u64, ShardError> {
        self.registry.require(from)?;
        self.registry.require(to)?;

        let mut moved = 0;
        for row in self.list_users(Some(from))? {
            moved += self.store.move_assignment(&self.kind, &row.name, to)?;
        }
        info!(kind = %self.kind, from, to, moved, "migrated bucket");
        Ok(moved)
    }

    /// Raw, extra and effective totals per bucket.
    pub fn list_buckets(&self) -> Result<LoadReport, ShardError> {
        let counts = self.store.count_by_bucket(&self.kind)?;
        Ok(LoadReport::new(&self.kind, &self.registry.snapshot(), &counts))
    }

    fn exactly_one(&self, name: &str) -> Result<Assignment, ShardError> {
        let mut rows = self.store.find_by_name(&self.kind, name)?;
        match rows.len() {
            0 => Err(ShardError::NotFound {
                name: name.to_string(),
            }),
            1 => Ok(rows.remove(0)),
            count => Err(ShardError::Ambiguous {
                kind: self.kind.clone(),
                name: name.to_string(),
                count,
            }),
        }
    }
}
