//! Contract test: snapshot durability and restart recovery
//!
//! Constraints verified:
//! - The snapshot written after a set of mutations rehydrates a fresh store
//!   into an identical id → record mapping
//! - An absent snapshot file boots an empty store
//! - A corrupt snapshot file degrades to an empty store instead of failing
//!   startup

mod common;

use common::*;
use relaydir_core::{FileSnapshotStore, RelayStore};
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn snapshot_round_trip_reproduces_identical_mapping() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relays.json");
    let clock = ManualClock::new(1_000);

    let first = RelayStore::open(
        Arc::new(FileSnapshotStore::new(&path).await.unwrap()),
        clock.clone(),
    )
    .await;

    first.register("r1", "10.0.0.1", 9000, "pk-1").await.unwrap();
    first.register("r2", "10.0.0.2", 9001, "pk-2").await.unwrap();
    first.register("r3", "10.0.0.3", 9002, "pk-3").await.unwrap();
    clock.advance(5_000);
    first.heartbeat("r2").await.unwrap();
    first.remove("r3").await.unwrap();

    let expected = first.snapshot().await;

    // A fresh store over the same file sees exactly the same records
    let second = RelayStore::open(
        Arc::new(FileSnapshotStore::new(&path).await.unwrap()),
        clock.clone(),
    )
    .await;

    assert_eq!(second.snapshot().await, expected);
    assert_eq!(second.len().await, 2);
    assert_eq!(second.snapshot().await["r2"].last_seen, 6_000);
}

#[tokio::test]
async fn absent_snapshot_boots_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never-written.json");

    let store = RelayStore::open(
        Arc::new(FileSnapshotStore::new(&path).await.unwrap()),
        ManualClock::new(0),
    )
    .await;

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn corrupt_snapshot_boots_empty_and_recovers_on_next_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relays.json");
    tokio::fs::write(&path, b"{ definitely not json").await.unwrap();

    let store = RelayStore::open(
        Arc::new(FileSnapshotStore::new(&path).await.unwrap()),
        ManualClock::new(1_000),
    )
    .await;
    assert!(store.is_empty().await);

    // The next committed mutation overwrites the corrupt file wholesale
    store.register("r1", "10.0.0.1", 9000, "pk").await.unwrap();

    let reloaded = FileSnapshotStore::new(&path).await.unwrap();
    let records = relaydir_core::traits::SnapshotStore::load(&reloaded)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.contains_key("r1"));
}
