// # Snapshot Store Trait
//
// Defines the interface for durable registry snapshots.
//
// ## Purpose
//
// The registry rewrites its full state through this interface after every
// committed mutation (register, heartbeat, remove, sweeper eviction) and
// reads it back once at startup. Durability is best-effort: the registry
// logs and swallows persistence failures, and no retries are performed.
//
// ## Implementations
//
// - File-based: a single JSON file, rewritten in full ([`crate::snapshot::FileSnapshotStore`])
// - In-memory: tests and ephemeral deployments ([`crate::snapshot::MemorySnapshotStore`])

use async_trait::async_trait;
use std::collections::HashMap;

use crate::store::RelayRecord;

/// Trait for snapshot persistence implementations
///
/// Implementations must be thread-safe and usable across async tasks. The
/// registry serializes calls to [`persist`](SnapshotStore::persist) itself
/// (they happen under the store's write lock), so implementations never see
/// two concurrent writes.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted snapshot
    ///
    /// # Returns
    ///
    /// - `Ok(mapping)`: The persisted id → record mapping; an absent backing
    ///   store yields an empty mapping
    /// - `Err(Error)`: The backing data exists but is unreadable or corrupt;
    ///   callers degrade to an empty registry rather than failing startup
    async fn load(&self) -> crate::Result<HashMap<String, RelayRecord>>;

    /// Persist the full snapshot, replacing any previous one
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Snapshot durably recorded
    /// - `Err(Error)`: Write failed; the in-memory mutation that triggered
    ///   this call stands regardless
    async fn persist(&self, snapshot: &HashMap<String, RelayRecord>) -> crate::Result<()>;
}
