//! Error types for the relay directory
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for directory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the relay directory
#[derive(Error, Debug)]
pub enum Error {
    /// A required request field was absent or empty
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The relay address is not a well-formed IPv4 dotted quad
    #[error("invalid address format: {0}")]
    InvalidAddress(String),

    /// The relay port is not an integer in [1, 65535]
    #[error("invalid port (must be integer between 1 and 65535): {0}")]
    InvalidPort(String),

    /// A relay with the given id is already registered
    #[error("relay with this ID already exists: {0}")]
    DuplicateId(String),

    /// No relay with the given id exists
    #[error("relay not found: {0}")]
    NotFound(String),

    /// Snapshot persistence errors (never surfaced to callers of the store)
    #[error("snapshot store error: {0}")]
    Snapshot(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a missing-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Create an invalid-address error
    pub fn invalid_address(address: impl Into<String>) -> Self {
        Self::InvalidAddress(address.into())
    }

    /// Create an invalid-port error
    pub fn invalid_port(port: impl Into<String>) -> Self {
        Self::InvalidPort(port.into())
    }

    /// Create a duplicate-id error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId(id.into())
    }

    /// Create a "not found" error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a snapshot store error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
