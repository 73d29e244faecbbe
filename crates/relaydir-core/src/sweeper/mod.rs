//! Liveness sweeper
//!
//! The LivenessSweeper is the only timeout-driven actor in the system. On a
//! fixed poll interval it scans the registry and evicts every relay whose
//! `last_seen` is older than the configured timeout, using the same locked
//! removal path as an explicit delete (snapshot write included).
//!
//! ## Lifecycle
//!
//! 1. Create with [`LivenessSweeper::new`]
//! 2. Start with [`LivenessSweeper::run`]
//! 3. Runs until a shutdown signal is received
//!
//! Between ticks the sweeper is idle; a pass is one full scan. Eviction lag
//! is bounded: a relay is removed at most one poll interval after its
//! timeout threshold is crossed. Sweep-side persistence failures are logged
//! inside the store and never abort a pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::SweeperConfig;
use crate::error::Result;
use crate::store::RelayStore;
use crate::traits::Clock;

/// Events emitted by the sweeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweeperEvent {
    /// Sweeper started
    Started,

    /// A relay was evicted for missing its heartbeat timeout
    RelayEvicted {
        relay_id: String,
    },

    /// One full sweep pass finished
    SweepCompleted {
        evicted: usize,
    },

    /// Sweeper stopped
    Stopped {
        reason: String,
    },
}

/// Recurring background task that evicts stale relays
///
/// The sweeper shares the [`RelayStore`] with the request handlers and goes
/// through the same locked mutation path, so a sweep can never interleave
/// with a half-applied registration or heartbeat.
pub struct LivenessSweeper {
    /// The registry to scan
    store: Arc<RelayStore>,

    /// Fixed wall-clock interval between passes
    poll_interval: Duration,

    /// Staleness threshold for eviction
    relay_timeout: Duration,

    /// Time source for staleness decisions
    clock: Arc<dyn Clock>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SweeperEvent>,
}

impl LivenessSweeper {
    /// Create a new sweeper
    ///
    /// # Returns
    ///
    /// A tuple of (sweeper, event_receiver) where event_receiver yields
    /// sweeper events.
    pub fn new(
        store: Arc<RelayStore>,
        config: &SweeperConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<SweeperEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let sweeper = Self {
            store,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            relay_timeout: Duration::from_secs(config.relay_timeout_secs),
            clock,
            event_tx: tx,
        };

        (sweeper, rx)
    }

    /// Run the sweeper until SIGINT
    ///
    /// No sweep state is terminal; this loops for the lifetime of the
    /// process.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the sweeper with a controlled shutdown signal
    ///
    /// Used by the daemon and by tests that need deterministic shutdown
    /// instead of OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(SweeperEvent::Started);
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            relay_timeout_secs = self.relay_timeout.as_secs(),
            "liveness sweeper started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        // The first tick completes immediately; consume it so passes start
        // one full interval after startup.
        ticker.tick().await;

        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep_once().await,

                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(SweeperEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep_once().await,

                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(SweeperEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// One full scan-and-evict pass
    async fn sweep_once(&self) {
        let now_ms = self.clock.now_ms();
        let evicted = self.store.evict_stale(now_ms, self.relay_timeout).await;

        for relay_id in &evicted {
            self.emit_event(SweeperEvent::RelayEvicted {
                relay_id: relay_id.clone(),
            });
        }

        if evicted.is_empty() {
            debug!("sweep pass completed, nothing stale");
        } else {
            info!(evicted = evicted.len(), "sweep pass evicted stale relay(s)");
        }

        self.emit_event(SweeperEvent::SweepCompleted {
            evicted: evicted.len(),
        });
    }

    fn emit_event(&self, event: SweeperEvent) {
        // Dropped events only mean a slow consumer; the sweep itself has
        // already committed.
        if self.event_tx.try_send(event).is_err() {
            warn!("sweeper event channel full, dropping event");
        }
    }
}
