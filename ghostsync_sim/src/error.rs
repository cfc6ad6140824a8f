//! Error types for the simulation harness.

use ghostsync_core::SyncError;
use thiserror::Error;

/// Errors that can stop a scenario run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Reader or adapter configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] SyncError),

    /// Export could not be written
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export could not be serialized
    #[error("Export serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
