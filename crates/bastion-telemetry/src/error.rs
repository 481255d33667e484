//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log configuration could not be applied (e.g. invalid directive).
    #[error("telemetry configuration error: {0}")]
    Config(String),

    /// A global subscriber was already installed.
    #[error("telemetry already initialized")]
    AlreadyInitialized,
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
