//! AssignmentStore - Abstract persistence for assignments.

use std::collections::BTreeMap;

use super::{Assignment, StoreError};

/// Abstract persistence for assignments.
///
/// Every write commits before it returns. Implementations must reject a
/// second row for an existing `(kind, name)` pair with
/// [`StoreError::DuplicateKey`]; that constraint is the only thing keeping
/// concurrent writers apart.
pub trait AssignmentStore: Send + Sync {
    /// Create the backing table and indexes if they do not exist yet.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Exact-match lookup of `name` within `kind`.
    fn find_assignment(&self, kind: &str, name: &str) -> Result<Option<Assignment>, StoreError>;

    /// Insert a new row. Fails with `DuplicateKey` if `(kind, name)` exists.
    fn insert_assignment(
        &self,
        kind: &str,
        bucket: &str,
        name: &str,
    ) -> Result<Assignment, StoreError>;

    /// Number of rows per bucket within `kind`. Buckets without rows are absent.
    fn count_by_bucket(&self, kind: &str) -> Result<BTreeMap<String, u64>, StoreError>;

    /// All rows of `kind`, optionally restricted to one bucket, ordered by id.
    fn list_assignments(
        &self,
        kind: &str,
        bucket: Option<&str>,
    ) -> Result<Vec<Assignment>, StoreError>;

    /// Every row matching `(kind, name)`.
    ///
    /// Returns a list rather than an option so callers can detect a store
    /// that lost its uniqueness constraint.
    fn find_by_name(&self, kind: &str, name: &str) -> Result<Vec<Assignment>, StoreError>;

    /// Delete the rows for `(kind, name)`. Returns how many were removed.
    fn delete_assignment(&self, kind: &str, name: &str) -> Result<u64, StoreError>;

    /// Point `(kind, name)` at `bucket`. Returns how many rows changed.
    fn move_assignment(&self, kind: &str, name: &str, bucket: &str) -> Result<u64, StoreError>;
}
