//! Error types for the IMU risk engine

use thiserror::Error;

/// Errors that can occur while configuring or driving a monitoring session
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Statistics requested over an empty window")]
    EmptyWindow,

    #[error("Monitoring session is not active")]
    SessionInactive,

    #[error("Failed to parse sample input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
