//! Configuration types for the relay directory
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main directory configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// HTTP listen configuration
    #[serde(default)]
    pub listen: ListenConfig,

    /// Snapshot persistence configuration
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    /// Liveness sweeper settings
    #[serde(default)]
    pub sweeper: SweeperConfig,
}

impl DirectoryConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.listen.validate()?;
        self.snapshot.validate()?;
        self.sweeper.validate()?;
        Ok(())
    }
}

/// HTTP listen address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Host to bind (IP address)
    #[serde(default = "default_listen_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl ListenConfig {
    /// Validate the listen configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.host.is_empty() {
            return Err(crate::Error::config("listen host cannot be empty"));
        }
        if self.host.parse::<std::net::IpAddr>().is_err() {
            return Err(crate::Error::config(format!(
                "listen host must be an IP address, got '{}'",
                self.host
            )));
        }
        Ok(())
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotConfig {
    /// File-based snapshot store
    File {
        /// Path to the snapshot file
        path: String,
    },

    /// In-memory snapshot store (not persistent)
    #[default]
    Memory,
}

impl SnapshotConfig {
    /// Validate the snapshot configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SnapshotConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("snapshot file path cannot be empty"));
                }
                Ok(())
            }
            SnapshotConfig::Memory => Ok(()),
        }
    }
}

/// Liveness sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Fixed interval between sweep passes (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Heartbeat staleness threshold for eviction (in seconds)
    #[serde(default = "default_relay_timeout_secs")]
    pub relay_timeout_secs: u64,

    /// Capacity of the sweeper event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SweeperConfig {
    /// Validate the sweeper configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("sweeper poll interval must be > 0"));
        }
        if self.relay_timeout_secs == 0 {
            return Err(crate::Error::config("relay timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "sweeper event channel capacity must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            relay_timeout_secs: default_relay_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    5600
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_relay_timeout_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DirectoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen.port, 5600);
        assert_eq!(config.sweeper.poll_interval_secs, 10);
        assert_eq!(config.sweeper.relay_timeout_secs, 300);
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut config = DirectoryConfig::default();
        config.sweeper.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DirectoryConfig::default();
        config.sweeper.relay_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_snapshot_requires_path() {
        let config = DirectoryConfig {
            snapshot: SnapshotConfig::File {
                path: String::new(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn listen_host_must_be_ip() {
        let mut config = DirectoryConfig::default();
        config.listen.host = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn snapshot_config_deserializes_tagged() {
        let config: SnapshotConfig =
            serde_json::from_str(r#"{"type": "file", "path": "/tmp/relays.json"}"#).unwrap();
        assert!(matches!(config, SnapshotConfig::File { .. }));

        let config: SnapshotConfig = serde_json::from_str(r#"{"type": "memory"}"#).unwrap();
        assert!(matches!(config, SnapshotConfig::Memory));
    }
}
