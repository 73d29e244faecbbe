// # relaydir-core
//
// Core library for the relay directory service.
//
// ## Architecture Overview
//
// This library provides the registry and liveness lifecycle for a peer
// network directory:
// - **validate**: Pure well-formedness checks for relay addresses and ports
// - **RelayStore**: Concurrency-safe registry of relay records; owns all
//   mutation rules (register, heartbeat, remove, snapshot)
// - **LivenessSweeper**: Recurring background task that evicts relays whose
//   heartbeats have gone stale
// - **SnapshotStore**: Trait for durable full-snapshot persistence, invoked
//   after every committed mutation and once at startup
// - **Clock**: Injectable time source so liveness behavior is testable
//   without wall-clock sleeps
//
// ## Design Principles
//
// 1. **Single authoritative store**: One encapsulated store object with an
//    explicit lifecycle, no ambient globals
// 2. **Best-effort durability**: Snapshot writes are triggered synchronously
//    by mutations but a write failure never aborts the in-memory mutation
// 3. **Pluggable persistence**: The snapshot layer is a trait so tests can
//    substitute an in-memory fake and assert call sequencing
// 4. **Bounded staleness**: Eviction lags the timeout threshold by at most
//    one sweeper poll interval

pub mod config;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod sweeper;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use config::{DirectoryConfig, ListenConfig, SnapshotConfig, SweeperConfig};
pub use error::{Error, Result};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore};
pub use store::{HealthSummary, RelayInfo, RelayRecord, RelayStore};
pub use sweeper::{LivenessSweeper, SweeperEvent};
pub use traits::{Clock, SnapshotStore, SystemClock};
