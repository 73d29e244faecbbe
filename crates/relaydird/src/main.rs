// # relaydird - Relay Directory Daemon
//
// This is a THIN integration layer: it reads configuration, wires the core
// components together, and handles process lifecycle. All registry logic
// lives in relaydir-core; all request translation lives in relaydir-http.
//
// The relaydird daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Opening the relay store from its snapshot
// 4. Starting the liveness sweeper and the HTTP server
// 5. Shutting both down on SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Listener
// - `RELAYDIR_LISTEN_HOST`: IP address to bind (default 127.0.0.1)
// - `RELAYDIR_LISTEN_PORT`: Port to bind (default 5600)
//
// ### Snapshot store
// - `RELAYDIR_SNAPSHOT_STORE_TYPE`: Type of snapshot store (file, memory)
// - `RELAYDIR_SNAPSHOT_PATH`: Path to snapshot file (for file store)
//
// ### Sweeper
// - `RELAYDIR_SWEEP_INTERVAL_SECS`: Seconds between sweep passes (default 10)
// - `RELAYDIR_RELAY_TIMEOUT_SECS`: Heartbeat staleness threshold (default 300)
//
// ### Logging
// - `RELAYDIR_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export RELAYDIR_SNAPSHOT_STORE_TYPE=file
// export RELAYDIR_SNAPSHOT_PATH=/var/lib/relaydir/relays.json
// export RELAYDIR_LISTEN_PORT=5600
//
// relaydird
// ```

use anyhow::Result;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use relaydir_core::traits::{Clock, SnapshotStore};
use relaydir_core::{
    DirectoryConfig, FileSnapshotStore, LivenessSweeper, ListenConfig, MemorySnapshotStore,
    RelayStore, SnapshotConfig, SweeperConfig, SweeperEvent, SystemClock,
};
use relaydir_http::{DirectoryContext, DirectoryServer};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_host: String,
    listen_port: u16,
    snapshot_store_type: String,
    snapshot_path: Option<String>,
    sweep_interval_secs: u64,
    relay_timeout_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            listen_host: env::var("RELAYDIR_LISTEN_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            listen_port: env::var("RELAYDIR_LISTEN_PORT")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| anyhow::anyhow!("RELAYDIR_LISTEN_PORT is not a valid port: {}", e))?
                .unwrap_or(5600),
            snapshot_store_type: env::var("RELAYDIR_SNAPSHOT_STORE_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            snapshot_path: env::var("RELAYDIR_SNAPSHOT_PATH").ok(),
            sweep_interval_secs: env::var("RELAYDIR_SWEEP_INTERVAL_SECS")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| {
                    anyhow::anyhow!("RELAYDIR_SWEEP_INTERVAL_SECS is not a number: {}", e)
                })?
                .unwrap_or(10),
            relay_timeout_secs: env::var("RELAYDIR_RELAY_TIMEOUT_SECS")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| {
                    anyhow::anyhow!("RELAYDIR_RELAY_TIMEOUT_SECS is not a number: {}", e)
                })?
                .unwrap_or(300),
            log_level: env::var("RELAYDIR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the environment-level configuration
    ///
    /// Core invariants (host shape, non-empty paths, non-zero intervals) are
    /// checked again by `DirectoryConfig::validate`; this catches the
    /// env-specific mistakes with actionable messages.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("RELAYDIR_LISTEN_PORT must be between 1 and 65535");
        }

        match self.snapshot_store_type.as_str() {
            "file" | "memory" => {}
            other => anyhow::bail!(
                "RELAYDIR_SNAPSHOT_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        }

        if self.snapshot_store_type == "file" {
            match &self.snapshot_path {
                Some(path) if !path.is_empty() => {}
                _ => anyhow::bail!(
                    "RELAYDIR_SNAPSHOT_PATH is required when RELAYDIR_SNAPSHOT_STORE_TYPE=file. \
                    Set it via: export RELAYDIR_SNAPSHOT_PATH=/var/lib/relaydir/relays.json"
                ),
            }
        }

        if !(1..=3600).contains(&self.sweep_interval_secs) {
            anyhow::bail!(
                "RELAYDIR_SWEEP_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.sweep_interval_secs
            );
        }

        if !(1..=86_400).contains(&self.relay_timeout_secs) {
            anyhow::bail!(
                "RELAYDIR_RELAY_TIMEOUT_SECS must be between 1 and 86400 seconds. Got: {}",
                self.relay_timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "RELAYDIR_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }

    /// Build the core configuration from the environment settings
    fn directory_config(&self) -> DirectoryConfig {
        DirectoryConfig {
            listen: ListenConfig {
                host: self.listen_host.clone(),
                port: self.listen_port,
            },
            snapshot: match self.snapshot_store_type.as_str() {
                "file" => SnapshotConfig::File {
                    path: self.snapshot_path.clone().unwrap_or_default(),
                },
                _ => SnapshotConfig::Memory,
            },
            sweeper: SweeperConfig {
                poll_interval_secs: self.sweep_interval_secs,
                relay_timeout_secs: self.relay_timeout_secs,
                ..SweeperConfig::default()
            },
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let directory_config = config.directory_config();
    if let Err(e) = directory_config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting relaydird daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(directory_config).await {
            error!("Daemon error: {}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: DirectoryConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Snapshot store per configuration
    let snapshot_store: Arc<dyn SnapshotStore> = match &config.snapshot {
        SnapshotConfig::File { path } => {
            info!("Using file snapshot store at {}", path);
            Arc::new(FileSnapshotStore::new(path).await?)
        }
        SnapshotConfig::Memory => {
            info!("Using in-memory snapshot store (registry is lost on restart)");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    // Rehydrate the registry
    let store = Arc::new(RelayStore::open(snapshot_store, clock.clone()).await);
    info!("Registry opened with {} relay(s)", store.len().await);

    // Start the liveness sweeper
    let (sweeper, event_rx) = LivenessSweeper::new(store.clone(), &config.sweeper, clock.clone());
    let (sweeper_shutdown_tx, sweeper_shutdown_rx) = oneshot::channel();
    let sweeper_handle =
        tokio::spawn(async move { sweeper.run_with_shutdown(Some(sweeper_shutdown_rx)).await });

    // Log sweeper events as they arrive
    let event_handle = tokio::spawn(drain_sweeper_events(event_rx));

    // Start the HTTP server
    let ctx = Arc::new(DirectoryContext::new(
        store,
        clock,
        Duration::from_secs(config.sweeper.relay_timeout_secs),
    ));
    let addr = SocketAddr::new(config.listen.host.parse()?, config.listen.port);
    let server = DirectoryServer::bind(addr, ctx).await?;
    let (server_shutdown_tx, server_shutdown_rx) = oneshot::channel();
    let server_handle = tokio::spawn(server.serve(server_shutdown_rx));

    info!("Daemon initialized successfully");

    // Wait for shutdown signal
    let signal_name = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal_name);

    let _ = server_shutdown_tx.send(());
    let _ = sweeper_shutdown_tx.send(());

    server_handle.await??;
    sweeper_handle.await??;
    event_handle.await?;

    info!("Shutdown complete");
    Ok(())
}

/// Consume sweeper events and log them
async fn drain_sweeper_events(event_rx: mpsc::Receiver<SweeperEvent>) {
    let mut events = ReceiverStream::new(event_rx);

    while let Some(event) = events.next().await {
        match event {
            SweeperEvent::RelayEvicted { relay_id } => {
                info!(%relay_id, "relay evicted after heartbeat timeout");
            }
            SweeperEvent::SweepCompleted { evicted } if evicted > 0 => {
                debug!(evicted, "sweep pass completed");
            }
            SweeperEvent::Stopped { reason } => {
                info!(%reason, "sweeper stopped");
            }
            _ => {}
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal_name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(signal_name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
