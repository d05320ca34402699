//! Balancing and stability properties of the sharder over the in-memory store.

mod support;

use std::thread;

use sharder::{
    AssignmentStore, BucketRegistry, InMemoryAssignmentStore, Sharder, SharderOptions,
};
use support::{assign_all, names, ten_buckets};

#[test]
fn assign_is_idempotent() {
    let sharder = Sharder::open("hub", ten_buckets(), InMemoryAssignmentStore::new()).unwrap();
    let entries = names(0..25);

    let first: Vec<_> = entries.iter().map(|e| sharder.assign(e).unwrap()).collect();
    let second: Vec<_> = entries.iter().map(|e| sharder.assign(e).unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(sharder.store().list_assignments("hub", None).unwrap().len(), 25);
}

#[test]
fn multiple_equal_shards() {
    let sharder = Sharder::open("hub", ten_buckets(), InMemoryAssignmentStore::new()).unwrap();
    let entries = names(0..100);
    assign_all(&sharder, &entries);

    let shards = assign_all(&sharder, &entries);
    assert_eq!(shards.len(), 10);
    assert_eq!(shards.values().sum::<u64>(), 100);
    assert!(shards.values().all(|&count| count == 10));
}

#[test]
fn multiple_unequal_shards() {
    let sharder = Sharder::open("hub", ten_buckets(), InMemoryAssignmentStore::new()).unwrap();
    let shards = assign_all(&sharder, &names(0..99));

    assert_eq!(shards.len(), 10);
    assert_eq!(shards.values().sum::<u64>(), 99);
    let mut counts: Vec<_> = shards.values().copied().collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![9, 10, 10, 10, 10, 10, 10, 10, 10, 10]);
    // The bucket left one short is the last configured one.
    assert_eq!(shards["9"], 9);
}

#[test]
fn shard_with_extra_shards() {
    let registry = ten_buckets();
    let sharder = Sharder::open("hub", registry.clone(), InMemoryAssignmentStore::new()).unwrap();
    let mut shards = assign_all(&sharder, &names(0..100));

    // Two extra shards on the first bucket: the next 18 assignments are
    // spread over the other nine.
    registry.set_extra_shards("0", 2).unwrap();
    for (bucket, count) in assign_all(&sharder, &names(100..118)) {
        *shards.entry(bucket).or_default() += count;
    }

    assert_eq!(shards.values().sum::<u64>(), 118);
    for (bucket, count) in &shards {
        let expected = if bucket == "0" { 10 } else { 12 };
        assert_eq!(*count, expected, "bucket {bucket}");
    }

    // Ten more land one per bucket.
    for (bucket, count) in assign_all(&sharder, &names(118..128)) {
        *shards.entry(bucket).or_default() += count;
    }

    assert_eq!(shards.values().sum::<u64>(), 128);
    for (bucket, count) in &shards {
        let expected = if bucket == "0" { 11 } else { 13 };
        assert_eq!(*count, expected, "bucket {bucket}");
    }
}

#[test]
fn negative_extra_shards_attract_assignments() {
    let registry = BucketRegistry::from_names(["a", "b"]).unwrap();
    registry.set_extra_shards("b", -3).unwrap();
    let sharder = Sharder::open("hub", registry, InMemoryAssignmentStore::new()).unwrap();

    let shards = assign_all(&sharder, &names(0..5));
    assert_eq!(shards["a"], 1);
    assert_eq!(shards["b"], 4);
}

#[test]
fn reweighting_keeps_existing_assignments() {
    let registry = ten_buckets();
    let sharder = Sharder::open("hub", registry.clone(), InMemoryAssignmentStore::new()).unwrap();
    let entries = names(0..50);
    let before: Vec<_> = entries.iter().map(|e| sharder.assign(e).unwrap()).collect();

    registry.set_extra_shards("0", 100).unwrap();
    registry.set_extra_shards("5", -100).unwrap();

    let after: Vec<_> = entries.iter().map(|e| sharder.assign(e).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(sharder.assign("newcomer").unwrap(), "5");
}

#[test]
fn added_bucket_is_filled_first() {
    let registry = BucketRegistry::from_names(["a", "b"]).unwrap();
    let sharder = Sharder::open("hub", registry.clone(), InMemoryAssignmentStore::new()).unwrap();
    assign_all(&sharder, &names(0..10));

    registry
        .replace(
            ["a", "b", "c"]
                .into_iter()
                .map(sharder::Bucket::new)
                .collect(),
        )
        .unwrap();

    let shards = assign_all(&sharder, &names(10..15));
    assert_eq!(shards.get("c"), Some(&5));
}

#[test]
fn kinds_are_balanced_independently() {
    let store = InMemoryAssignmentStore::new();
    let registry = BucketRegistry::from_names(["a", "b"]).unwrap();
    let hubs = Sharder::open("hub", registry.clone(), store.clone()).unwrap();
    let homes = Sharder::open("home", registry, store).unwrap();

    assign_all(&hubs, &names(0..3));
    assert_eq!(homes.assign("0").unwrap(), "a");
    assert_eq!(hubs.report().unwrap().get("a").unwrap().raw, 2);
    assert_eq!(homes.report().unwrap().get("a").unwrap().raw, 1);
}

#[test]
fn opening_twice_does_not_duplicate_placeholders() {
    let store = InMemoryAssignmentStore::new();
    let options = SharderOptions {
        seed_placeholders: true,
    };

    Sharder::open_with("hub", ten_buckets(), store.clone(), options).unwrap();
    let sharder = Sharder::open_with("hub", ten_buckets(), store.clone(), options).unwrap();

    let rows = store.list_assignments("hub", None).unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|row| row.is_placeholder()));

    // Placeholders add the same offset everywhere, so the split is unchanged.
    let shards = assign_all(&sharder, &names(0..100));
    assert!(shards.values().all(|&count| count == 10));
}

#[test]
fn report_tracks_raw_and_effective_totals() {
    let registry = BucketRegistry::from_names(["a", "b"]).unwrap();
    registry.set_extra_shards("a", 2).unwrap();
    let sharder = Sharder::open("hub", registry, InMemoryAssignmentStore::new()).unwrap();
    assign_all(&sharder, &names(0..4));

    let report = sharder.report().unwrap();
    let a = report.get("a").unwrap();
    let b = report.get("b").unwrap();
    assert_eq!((a.raw, a.extra, a.effective), (1, 2, 3));
    assert_eq!((b.raw, b.extra, b.effective), (3, 0, 3));
}

#[test]
fn concurrent_callers_agree_on_every_bucket() {
    let sharder = Sharder::open("hub", ten_buckets(), InMemoryAssignmentStore::new()).unwrap();
    let entries = names(0..200);

    let results: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    entries
                        .iter()
                        .map(|e| sharder.assign(e).unwrap())
                        .collect::<Vec<String>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for other in &results[1..] {
        assert_eq!(&results[0], other);
    }
    let rows = sharder.store().list_assignments("hub", None).unwrap();
    assert_eq!(rows.len(), 200);
}
