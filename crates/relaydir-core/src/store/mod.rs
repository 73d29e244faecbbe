//! The relay registry
//!
//! The RelayStore is the authoritative in-memory map of relay id → relay
//! record. It owns every mutation rule:
//! - admission (field presence, address/port validation, id uniqueness)
//! - heartbeat-driven freshness (`last_seen` refresh)
//! - removal (explicit delete and sweeper eviction share one path)
//!
//! ## Concurrency
//!
//! All operations are mutually exclusive at single-operation granularity:
//! one `tokio::sync::RwLock` protects the map, mutations take the write
//! guard, reads take the read guard. Snapshot writes happen while the write
//! guard is held, so two persists can never commit out of order.
//!
//! ## Durability
//!
//! Every committed mutation triggers a full-snapshot write through the
//! [`SnapshotStore`] trait. A failed write is logged and swallowed; the
//! in-memory mutation stands. At startup the store rehydrates from
//! [`SnapshotStore::load`], degrading to an empty registry on error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{Clock, SnapshotStore};
use crate::validate;

/// A registered relay, keyed by its id in the registry map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    /// IPv4 dotted-quad address, validated on admission
    pub address: String,
    /// Port in [1, 65535]; the canonical stored representation is an integer
    pub port: u16,
    /// Opaque public key, stored and returned verbatim
    pub public_key: String,
    /// Milliseconds since epoch; refreshed by registration and heartbeats
    pub last_seen: i64,
}

/// Public projection of a relay for discovery queries
///
/// `last_seen` is intentionally absent: liveness is exposed only as the
/// aggregate [`HealthSummary`], never per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayInfo {
    pub id: String,
    pub address: String,
    pub port: u16,
    pub public_key: String,
}

/// Aggregate liveness counts over the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

/// Concurrency-safe registry of relay records
///
/// ## Lifecycle
///
/// Constructed once at startup via [`RelayStore::open`] (rehydrating from the
/// snapshot store) and shared behind an `Arc` between the request handlers
/// and the sweeper for the lifetime of the process.
pub struct RelayStore {
    /// Relay id → record; the single exclusive lock of the core
    relays: RwLock<HashMap<String, RelayRecord>>,

    /// Durable snapshot persistence, written through on every mutation
    snapshot_store: Arc<dyn SnapshotStore>,

    /// Time source for `last_seen` stamps
    clock: Arc<dyn Clock>,
}

impl RelayStore {
    /// Open the registry, rehydrating from the snapshot store
    ///
    /// A load failure (unreadable or corrupt snapshot) is logged and degrades
    /// to an empty registry; startup never fails here.
    pub async fn open(snapshot_store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>) -> Self {
        let relays = match snapshot_store.load().await {
            Ok(records) => {
                debug!("loaded {} relay record(s) from snapshot", records.len());
                records
            }
            Err(e) => {
                warn!("failed to load snapshot, starting empty: {}", e);
                HashMap::new()
            }
        };

        Self {
            relays: RwLock::new(relays),
            snapshot_store,
            clock,
        }
    }

    /// Register a new relay
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if id, address, or public key is empty
    /// - [`Error::InvalidAddress`] / [`Error::InvalidPort`] if validation fails
    /// - [`Error::DuplicateId`] if the id is already registered
    ///
    /// Registration never mutates an existing record; re-registering an id is
    /// always an error until the record is removed.
    pub async fn register(
        &self,
        id: &str,
        address: &str,
        port: i64,
        public_key: &str,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(Error::missing_field("id"));
        }
        if address.is_empty() {
            return Err(Error::missing_field("address"));
        }
        if public_key.is_empty() {
            return Err(Error::missing_field("public_key"));
        }
        if !validate::valid_address(address) {
            return Err(Error::invalid_address(address));
        }
        if !validate::valid_port(port) {
            return Err(Error::invalid_port(port.to_string()));
        }

        let mut relays = self.relays.write().await;
        if relays.contains_key(id) {
            return Err(Error::duplicate_id(id));
        }

        relays.insert(
            id.to_string(),
            RelayRecord {
                address: address.to_string(),
                port: port as u16,
                public_key: public_key.to_string(),
                last_seen: self.clock.now_ms(),
            },
        );
        info!(relay_id = %id, %address, port, "relay registered");

        self.persist_locked(&relays).await;
        Ok(())
    }

    /// Refresh a relay's freshness timestamp
    ///
    /// Returns the new `last_seen` value. The timestamp is monotonically
    /// non-decreasing per record even if the clock steps backwards.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingField`] if the id is empty
    /// - [`Error::NotFound`] if no relay with this id exists
    pub async fn heartbeat(&self, id: &str) -> Result<i64> {
        if id.is_empty() {
            return Err(Error::missing_field("id"));
        }

        let mut relays = self.relays.write().await;
        let record = relays.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        record.last_seen = record.last_seen.max(self.clock.now_ms());
        let last_seen = record.last_seen;
        debug!(relay_id = %id, last_seen, "heartbeat received");

        self.persist_locked(&relays).await;
        Ok(last_seen)
    }

    /// Remove a relay from the registry
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no relay with this id exists
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut relays = self.relays.write().await;
        if relays.remove(id).is_none() {
            return Err(Error::not_found(id));
        }
        info!(relay_id = %id, "relay removed");

        self.persist_locked(&relays).await;
        Ok(())
    }

    /// List all registered relays for discovery
    ///
    /// Never fails. Order is unspecified.
    pub async fn list(&self) -> Vec<RelayInfo> {
        let relays = self.relays.read().await;
        relays
            .iter()
            .map(|(id, record)| RelayInfo {
                id: id.clone(),
                address: record.address.clone(),
                port: record.port,
                public_key: record.public_key.clone(),
            })
            .collect()
    }

    /// Aggregate liveness counts at time `now_ms`
    ///
    /// A relay is active iff `now_ms - last_seen <= timeout`. Never fails.
    pub async fn health_summary(&self, now_ms: i64, timeout: Duration) -> HealthSummary {
        let relays = self.relays.read().await;
        let timeout_ms = timeout.as_millis() as i64;
        let total = relays.len();
        let active = relays
            .values()
            .filter(|record| now_ms - record.last_seen <= timeout_ms)
            .count();

        HealthSummary {
            total,
            active,
            inactive: total - active,
        }
    }

    /// Evict every relay whose heartbeat is older than `timeout` at `now_ms`
    ///
    /// One write-locked pass; each eviction is the same removal as an
    /// explicit [`remove`](RelayStore::remove), including the snapshot write.
    /// Returns the evicted ids.
    pub async fn evict_stale(&self, now_ms: i64, timeout: Duration) -> Vec<String> {
        let timeout_ms = timeout.as_millis() as i64;
        let mut relays = self.relays.write().await;

        let stale: Vec<String> = relays
            .iter()
            .filter(|(_, record)| now_ms - record.last_seen > timeout_ms)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            relays.remove(id);
            info!(relay_id = %id, "removing inactive relay");
            self.persist_locked(&relays).await;
        }

        stale
    }

    /// Number of registered relays
    pub async fn len(&self) -> usize {
        self.relays.read().await.len()
    }

    /// Check whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.relays.read().await.is_empty()
    }

    /// Clone of the current id → record mapping
    pub async fn snapshot(&self) -> HashMap<String, RelayRecord> {
        self.relays.read().await.clone()
    }

    /// Write the full snapshot while the caller holds the write guard
    ///
    /// Failure is logged and swallowed; durability is best-effort and never
    /// part of a mutation's success contract.
    async fn persist_locked(&self, relays: &HashMap<String, RelayRecord>) {
        if let Err(e) = self.snapshot_store.persist(relays).await {
            warn!("snapshot write failed, in-memory state unaffected: {}", e);
        }
    }
}
