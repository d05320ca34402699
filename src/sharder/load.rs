//! Load tables: per-bucket counts merged with the registry's weighting.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::Bucket;

/// Effective load of one configured bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketLoad {
    pub bucket: String,
    /// Rows currently stored for the bucket.
    pub raw: u64,
    /// Configured `extra_shards` bias.
    pub extra: i64,
    /// `raw + extra`.
    pub effective: i64,
    /// False for buckets that only exist in the store.
    pub configured: bool,
}

impl BucketLoad {
    fn new(bucket: &str, raw: u64, extra: i64, configured: bool) -> Self {
        Self {
            bucket: bucket.to_string(),
            raw,
            extra,
            effective: (raw as i64).saturating_add(extra),
            configured,
        }
    }
}

/// Effective loads of the configured buckets, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTable {
    entries: Vec<BucketLoad>,
}

impl LoadTable {
    /// Merge grouped row counts with the registry.
    ///
    /// Configured buckets missing from `counts` load as zero. Buckets in
    /// `counts` that are not configured are ignored.
    pub fn from_counts(buckets: &[Bucket], counts: &BTreeMap<String, u64>) -> Self {
        let entries = buckets
            .iter()
            .map(|bucket| {
                let raw = counts.get(&bucket.name).copied().unwrap_or(0);
                BucketLoad::new(&bucket.name, raw, bucket.extra_shards, true)
            })
            .collect();
        Self { entries }
    }

    /// The bucket with the smallest effective load.
    ///
    /// Ties go to the bucket configured first. `None` only for an empty table.
    pub fn least_loaded(&self) -> Option<&BucketLoad> {
        let mut best: Option<&BucketLoad> = None;
        for entry in &self.entries {
            match best {
                Some(current) if current.effective <= entry.effective => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    pub fn entries(&self) -> &[BucketLoad] {
        &self.entries
    }

    pub fn get(&self, bucket: &str) -> Option<&BucketLoad> {
        self.entries.iter().find(|entry| entry.bucket == bucket)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for LoadTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", entry.bucket, entry.effective)?;
        }
        write!(f, "}}")
    }
}

/// Raw, extra and effective totals for observability.
///
/// Configured buckets come first in registry order, followed by any bucket
/// that still has rows in the store but was removed from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub kind: String,
    pub buckets: Vec<BucketLoad>,
}

impl LoadReport {
    pub fn new(kind: &str, buckets: &[Bucket], counts: &BTreeMap<String, u64>) -> Self {
        let mut loads = LoadTable::from_counts(buckets, counts).entries;
        for (bucket, raw) in counts {
            if !buckets.iter().any(|b| &b.name == bucket) {
                loads.push(BucketLoad::new(bucket, *raw, 0, false));
            }
        }
        Self {
            kind: kind.to_string(),
            buckets: loads,
        }
    }

    pub fn get(&self, bucket: &str) -> Option<&BucketLoad> {
        self.buckets.iter().find(|entry| entry.bucket == bucket)
    }

    /// Sum of raw row counts across every bucket in the report.
    pub fn total_raw(&self) -> u64 {
        self.buckets.iter().map(|entry| entry.raw).sum()
    }
}

/// Renders `{"bucket": "raw+extra=effective", ...}`.
impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary: serde_json::Map<String, serde_json::Value> = self
            .buckets
            .iter()
            .map(|entry| {
                (
                    entry.bucket.clone(),
                    format!("{}+{}={}", entry.raw, entry.extra, entry.effective).into(),
                )
            })
            .collect();
        let json = serde_json::to_string(&summary).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
