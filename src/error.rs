//! Error types for GenUI Telemetry

use thiserror::Error;

/// Errors surfaced by the telemetry engine.
///
/// Signal capture itself never fails; these come from configuration,
/// serialization and the durable storage boundary.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),
}
