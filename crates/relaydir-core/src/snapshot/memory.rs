// # Memory Snapshot Store
//
// In-memory implementation of SnapshotStore.
//
// ## Purpose
//
// Keeps the last persisted snapshot in memory without touching disk. Useful
// for tests and for ephemeral deployments where losing the registry on
// restart is acceptable (relays re-register and heartbeat their way back).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::RelayRecord;
use crate::traits::SnapshotStore;

/// In-memory snapshot store implementation
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<RwLock<HashMap<String, RelayRecord>>>,
}

impl MemorySnapshotStore {
    /// Create a new empty memory snapshot store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with records, as if previously persisted
    pub fn with_records(records: HashMap<String, RelayRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> crate::Result<HashMap<String, RelayRecord>> {
        Ok(self.inner.read().await.clone())
    }

    async fn persist(&self, snapshot: &HashMap<String, RelayRecord>) -> crate::Result<()> {
        *self.inner.write().await = snapshot.clone();
        Ok(())
    }
}
