//! InMemoryAssignmentStore - BTreeMap-backed assignment store for testing and embedding.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{Assignment, AssignmentStore, StoreError};

#[derive(Default)]
struct Table {
    /// Rows keyed by id, so iteration is insertion order.
    rows: BTreeMap<i64, Assignment>,
    /// Unique index on `(kind, name)`.
    by_key: HashMap<(String, String), i64>,
    next_id: i64,
}

/// In-memory assignment store.
///
/// Enforces the `(kind, name)` uniqueness constraint under a single write
/// lock. Clone-friendly via Arc; clones share storage.
#[derive(Clone, Default)]
pub struct InMemoryAssignmentStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryAssignmentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: &str, name: &str) -> (String, String) {
        (kind.to_string(), name.to_string())
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn find_assignment(&self, kind: &str, name: &str) -> Result<Option<Assignment>, StoreError> {
        let table = self
            .table
            .read()
            .map_err(|_| StoreError::LockPoisoned("find"))?;

        Ok(table
            .by_key
            .get(&Self::key(kind, name))
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    fn insert_assignment(
        &self,
        kind: &str,
        bucket: &str,
        name: &str,
    ) -> Result<Assignment, StoreError> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StoreError::LockPoisoned("insert"))?;

        let key = Self::key(kind, name);
        if table.by_key.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }

        table.next_id += 1;
        let assignment = Assignment {
            id: table.next_id,
            kind: kind.to_string(),
            bucket: bucket.to_string(),
            name: name.to_string(),
        };
        table.by_key.insert(key, assignment.id);
        table.rows.insert(assignment.id, assignment.clone());

        Ok(assignment)
    }

    fn count_by_bucket(&self, kind: &str) -> Result<BTreeMap<String, u64>, StoreError> {
        let table = self
            .table
            .read()
            .map_err(|_| StoreError::LockPoisoned("count"))?;

        let mut counts = BTreeMap::new();
        for row in table.rows.values().filter(|row| row.kind == kind) {
            *counts.entry(row.bucket.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn list_assignments(
        &self,
        kind: &str,
        bucket: Option<&str>,
    ) -> Result<Vec<Assignment>, StoreError> {
        let table = self
            .table
            .read()
            .map_err(|_| StoreError::LockPoisoned("list"))?;

        Ok(table
            .rows
            .values()
            .filter(|row| row.kind == kind)
            .filter(|row| bucket.map_or(true, |b| row.bucket == b))
            .cloned()
            .collect())
    }

    fn find_by_name(&self, kind: &str, name: &str) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.find_assignment(kind, name)?.into_iter().collect())
    }

    fn delete_assignment(&self, kind: &str, name: &str) -> Result<u64, StoreError> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StoreError::LockPoisoned("delete"))?;

        match table.by_key.remove(&Self::key(kind, name)) {
            Some(id) => {
                table.rows.remove(&id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn move_assignment(&self, kind: &str, name: &str, bucket: &str) -> Result<u64, StoreError> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StoreError::LockPoisoned("move"))?;

        let Some(id) = table.by_key.get(&Self::key(kind, name)).copied() else {
            return Ok(0);
        };
        match table.rows.get_mut(&id) {
            Some(row) => {
                row.bucket = bucket.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
