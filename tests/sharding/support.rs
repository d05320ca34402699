use std::collections::BTreeMap;
use std::ops::Range;

use sharder::{AssignmentStore, BucketRegistry, Sharder};

/// Buckets "0" through "9", equally weighted.
pub fn ten_buckets() -> BucketRegistry {
    BucketRegistry::from_names((0..10).map(|i| i.to_string())).unwrap()
}

pub fn names(range: Range<usize>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}

/// Assign every entry and count how many landed in each bucket.
pub fn assign_all<S: AssignmentStore>(
    sharder: &Sharder<S>,
    entries: &[String],
) -> BTreeMap<String, u64> {
    let mut shards = BTreeMap::new();
    for entry in entries {
        let bucket = sharder.assign(entry).unwrap();
        *shards.entry(bucket).or_default() += 1;
    }
    shards
}
