//! # Error Types
//!
//! Custom error types for the serial link drivers using `thiserror`.

use thiserror::Error;

/// Main error type for the link drivers
#[derive(Debug, Error)]
pub enum LinkError {
    /// Malformed or truncated protocol data handed to a slice decoder
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate device paths could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// A second instance of a single-instance driver was attached
    #[error("{0} driver is already attached")]
    AlreadyAttached(&'static str),

    /// Telemetry record serialization errors
    #[error("Telemetry serialization error: {0}")]
    Telemetry(#[from] serde_json::Error),
}

/// Result type alias for the link drivers
pub type Result<T> = std::result::Result<T, LinkError>;
