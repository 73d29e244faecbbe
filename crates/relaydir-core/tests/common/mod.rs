//! Test doubles and common utilities for the contract tests
//!
//! These doubles verify store/sweeper behavior without real I/O or wall
//! clocks: a manually-driven clock and a snapshot store that records every
//! persist call and can be told to fail.

// Not every contract-test binary uses every double.
#![allow(dead_code)]

use async_trait::async_trait;
use relaydir_core::traits::{Clock, SnapshotStore};
use relaydir_core::{Error, RelayRecord, RelayStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A clock driven entirely by the test
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(start_ms),
        })
    }

    /// Move the clock forward (or backward, with a negative delta)
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A snapshot store that records persists and can inject failures
pub struct RecordingSnapshotStore {
    /// Records returned by load()
    initial: Mutex<HashMap<String, RelayRecord>>,
    /// Most recent successfully persisted snapshot
    last_snapshot: Mutex<Option<HashMap<String, RelayRecord>>>,
    /// Call counter for persist()
    persist_call_count: AtomicUsize,
    /// When set, persist() fails without recording
    fail_persist: AtomicBool,
}

impl RecordingSnapshotStore {
    pub fn new() -> Arc<Self> {
        Self::with_initial(HashMap::new())
    }

    pub fn with_initial(records: HashMap<String, RelayRecord>) -> Arc<Self> {
        Arc::new(Self {
            initial: Mutex::new(records),
            last_snapshot: Mutex::new(None),
            persist_call_count: AtomicUsize::new(0),
            fail_persist: AtomicBool::new(false),
        })
    }

    /// Get the number of times persist() was called
    pub fn persist_call_count(&self) -> usize {
        self.persist_call_count.load(Ordering::SeqCst)
    }

    /// Get the most recent successfully persisted snapshot
    pub fn last_snapshot(&self) -> Option<HashMap<String, RelayRecord>> {
        self.last_snapshot.lock().unwrap().clone()
    }

    /// Make subsequent persist() calls fail (or succeed again)
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for RecordingSnapshotStore {
    async fn load(&self) -> Result<HashMap<String, RelayRecord>, Error> {
        Ok(self.initial.lock().unwrap().clone())
    }

    async fn persist(&self, snapshot: &HashMap<String, RelayRecord>) -> Result<(), Error> {
        self.persist_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(Error::snapshot("injected persist failure"));
        }
        *self.last_snapshot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }
}

/// A snapshot store whose load() always fails, as if the backing data were
/// corrupt
pub struct CorruptSnapshotStore;

#[async_trait]
impl SnapshotStore for CorruptSnapshotStore {
    async fn load(&self) -> Result<HashMap<String, RelayRecord>, Error> {
        Err(Error::snapshot("simulated corrupt snapshot"))
    }

    async fn persist(&self, _snapshot: &HashMap<String, RelayRecord>) -> Result<(), Error> {
        Ok(())
    }
}

/// Open a store over the given doubles
pub async fn open_store(
    snapshot: Arc<RecordingSnapshotStore>,
    clock: Arc<ManualClock>,
) -> Arc<RelayStore> {
    Arc::new(RelayStore::open(snapshot, clock).await)
}
