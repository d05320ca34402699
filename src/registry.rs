//! The configured set of buckets and their weighting.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One configured bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    /// Load added to this bucket's row count before buckets are compared.
    /// Positive values throttle new assignments; negative values attract them.
    #[serde(default)]
    pub extra_shards: i64,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra_shards: 0,
        }
    }

    pub fn with_extra_shards(mut self, extra_shards: i64) -> Self {
        self.extra_shards = extra_shards;
        self
    }
}

/// Shared, reconfigurable list of buckets.
///
/// Order is significant: it breaks ties between equally loaded buckets.
/// Clones share the same list, so a [`Sharder`](crate::Sharder) sees
/// reconfiguration done through any clone on its next decision.
#[derive(Debug, Clone)]
pub struct BucketRegistry {
    buckets: Arc<RwLock<Vec<Bucket>>>,
}

impl BucketRegistry {
    /// Build a registry, rejecting empty lists and repeated or blank names.
    pub fn new(buckets: Vec<Bucket>) -> Result<Self, ConfigError> {
        validate(&buckets)?;
        Ok(Self {
            buckets: Arc::new(RwLock::new(buckets)),
        })
    }

    /// Registry of equally weighted buckets.
    pub fn from_names<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Bucket::new).collect())
    }

    /// Copy of the current bucket list.
    pub fn snapshot(&self) -> Vec<Bucket> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|bucket| bucket.name == name)
    }

    /// Fail with `UnknownBucket` unless `name` is configured.
    pub fn require(&self, name: &str) -> Result<(), ConfigError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(ConfigError::UnknownBucket(name.to_string()))
        }
    }

    /// Change the weighting of one bucket.
    pub fn set_extra_shards(&self, name: &str, extra_shards: i64) -> Result<(), ConfigError> {
        let mut buckets = self.write();
        let bucket = buckets
            .iter_mut()
            .find(|bucket| bucket.name == name)
            .ok_or_else(|| ConfigError::UnknownBucket(name.to_string()))?;
        bucket.extra_shards = extra_shards;
        Ok(())
    }

    /// Swap in a whole new bucket list. The old list stays on validation failure.
    pub fn replace(&self, buckets: Vec<Bucket>) -> Result<(), ConfigError> {
        validate(&buckets)?;
        *self.write() = buckets;
        Ok(())
    }

    // A panic while holding the lock cannot leave a half-written Vec behind,
    // so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Bucket>> {
        self.buckets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Bucket>> {
        self.buckets.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn validate(buckets: &[Bucket]) -> Result<(), ConfigError> {
    if buckets.is_empty() {
        return Err(ConfigError::EmptyRegistry);
    }
    let mut seen = HashSet::new();
    for bucket in buckets {
        if bucket.name.is_empty() {
            return Err(ConfigError::EmptyBucketName);
        }
        if !seen.insert(bucket.name.as_str()) {
            return Err(ConfigError::DuplicateBucket(bucket.name.clone()));
        }
    }
    Ok(())
}
