//! The sharder against a SQLite database file shared by several handles.

use std::collections::BTreeMap;
use std::sync::Barrier;
use std::thread;

use sharder::{
    Admin, AssignmentStore, BucketRegistry, Sharder, SharderOptions, SqliteAssignmentStore,
};

fn temp_store() -> (tempfile::TempDir, SqliteAssignmentStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteAssignmentStore::open(dir.path().join("sharder.sqlite"));
    (dir, store)
}

fn ten_buckets() -> BucketRegistry {
    BucketRegistry::from_names((0..10).map(|i| i.to_string())).unwrap()
}

#[test]
fn open_creates_schema() {
    let (_dir, store) = temp_store();
    let sharder = Sharder::open("hub", ten_buckets(), store).unwrap();
    assert!(sharder.lookup("nobody").unwrap().is_none());
    assert_eq!(sharder.report().unwrap().total_raw(), 0);
}

#[test]
fn equal_split_and_stability() {
    let (_dir, store) = temp_store();
    let sharder = Sharder::open("hub", ten_buckets(), store).unwrap();

    let mut shards: BTreeMap<String, u64> = BTreeMap::new();
    let mut first = Vec::new();
    for i in 0..100 {
        let bucket = sharder.assign(&i.to_string()).unwrap();
        *shards.entry(bucket.clone()).or_default() += 1;
        first.push(bucket);
    }
    assert!(shards.values().all(|&count| count == 10));

    for (i, bucket) in first.iter().enumerate() {
        assert_eq!(&sharder.assign(&i.to_string()).unwrap(), bucket);
    }
}

#[test]
fn assignments_survive_reopen() {
    let (dir, store) = temp_store();
    let bucket = Sharder::open("hub", ten_buckets(), store)
        .unwrap()
        .assign("alice")
        .unwrap();

    let reopened = SqliteAssignmentStore::open(dir.path().join("sharder.sqlite"));
    let sharder = Sharder::open("hub", ten_buckets(), reopened).unwrap();
    assert_eq!(sharder.assign("alice").unwrap(), bucket);
}

#[test]
fn repeated_open_keeps_one_placeholder_per_bucket() {
    let (_dir, store) = temp_store();
    let options = SharderOptions {
        seed_placeholders: true,
    };

    for _ in 0..3 {
        Sharder::open_with("hub", ten_buckets(), store.clone(), options).unwrap();
    }

    let counts = store.count_by_bucket("hub").unwrap();
    assert_eq!(counts.len(), 10);
    assert!(counts.values().all(|&count| count == 1));
}

#[test]
fn simultaneous_assign_of_same_name_agrees() {
    let (_dir, store) = temp_store();
    Sharder::open("hub", ten_buckets(), store.clone()).unwrap();

    for round in 0..10 {
        let name = format!("contested-{round}");
        let barrier = Barrier::new(2);

        let buckets: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    // Each caller gets its own handle, like two processes would.
                    let sharder = Sharder::open("hub", ten_buckets(), store.clone()).unwrap();
                    let name = &name;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        sharder.assign(name).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(buckets[0], buckets[1]);
        assert_eq!(store.find_by_name("hub", &name).unwrap().len(), 1);
    }
}

#[test]
fn admin_overrides_are_seen_by_sharder() {
    let (_dir, store) = temp_store();
    let registry = BucketRegistry::from_names(["a", "b"]).unwrap();
    let sharder = Sharder::open("hub", registry.clone(), store.clone()).unwrap();
    let admin = Admin::new("hub", registry, store);

    assert_eq!(sharder.assign("alice").unwrap(), "a");
    admin.move_user("alice", "b").unwrap();
    assert_eq!(sharder.assign("alice").unwrap(), "b");

    admin.delete_user("alice").unwrap();
    // Both buckets are empty again; the first configured one wins.
    assert_eq!(sharder.assign("alice").unwrap(), "a");
}
