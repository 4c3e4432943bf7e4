//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The device refused the connection
    #[error("Connection refused: {0}")]
    Refused(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// No device / queue with the given name
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The OS queue rejected the job because it is busy
    #[error("Queue busy: {0}")]
    QueueBusy(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Delivery method not available on this platform
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
