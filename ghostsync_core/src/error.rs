//! Error types for GhostSync configuration.
//!
//! Reads and writes on the buffer never fail; only loading and validating
//! configuration can.

use thiserror::Error;

/// Errors raised while building readers and adapters from configuration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Simulated lag must be finite and non-negative
    #[error("Invalid simulated lag: {0}s")]
    InvalidLag(f64),

    /// Producer sample period must be finite and positive
    #[error("Invalid sample period: {0}s")]
    InvalidSamplePeriod(f64),

    /// Lane detection needs at least one lane coordinate
    #[error("Lane set is empty")]
    EmptyLaneSet,

    /// Smoothing rates must be finite and non-negative
    #[error("Invalid smoothing rate: {0}")]
    InvalidSmoothing(f64),

    /// Config file could not be read
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for the expected schema
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
