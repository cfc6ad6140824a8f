//! Configuration for the reader and its adapters.
//!
//! Every struct has a `Default` matching the values the lane runner ships
//! with, and can be loaded from JSON through [`GhostSyncConfig`].

use crate::error::SyncError;
use crate::sync_buffer::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lane recorded for a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalLanePolicy {
    /// Always lane 0; the next regular sample corrects it
    #[default]
    Placeholder,

    /// Lane of the most recently recorded sample (0 if none)
    CarryForward,
}

/// Configuration for a [`DelayedStateReader`](crate::DelayedStateReader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Read-side delay in seconds (default: 0.15)
    pub simulated_lag: f64,

    /// Buffer slots, floored at 8 (default: 256)
    pub capacity: usize,

    /// Lane used by terminal events (default: placeholder 0)
    pub terminal_lane: TerminalLanePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            simulated_lag: 0.15,
            capacity: DEFAULT_CAPACITY,
            terminal_lane: TerminalLanePolicy::Placeholder,
        }
    }
}

impl ReaderConfig {
    /// Checks the lag is finite and non-negative.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.simulated_lag.is_finite() || self.simulated_lag < 0.0 {
            return Err(SyncError::InvalidLag(self.simulated_lag));
        }
        Ok(())
    }
}

/// Configuration for the producer side ([`PoseSampler`](crate::adapters::PoseSampler)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Seconds between samples (default: 0.02, i.e. 50 Hz)
    pub sample_period: f64,

    /// Reference X coordinate of each lane
    pub lanes: Vec<f64>,

    /// Height of the ground plane
    pub ground_height: f64,

    /// Max distance from the ground still counted as grounded (default: 0.001)
    pub ground_tolerance: f64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self::centered(0.0, 3.0, 0.0)
    }
}

impl ProducerConfig {
    /// Three lanes at `mid_x - move_step`, `mid_x`, `mid_x + move_step`.
    pub fn centered(mid_x: f64, move_step: f64, ground_height: f64) -> Self {
        Self {
            sample_period: 0.02,
            lanes: vec![mid_x - move_step, mid_x, mid_x + move_step],
            ground_height,
            ground_tolerance: 0.001,
        }
    }

    /// Checks the period is positive and at least one lane exists.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.sample_period.is_finite() || self.sample_period <= 0.0 {
            return Err(SyncError::InvalidSamplePeriod(self.sample_period));
        }
        if self.lanes.is_empty() {
            return Err(SyncError::EmptyLaneSet);
        }
        Ok(())
    }
}

/// Configuration for the consumer side ([`GhostFollower`](crate::adapters::GhostFollower)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Exponential smoothing rate for position, 1/s (default: 10)
    pub position_smooth: f64,

    /// Exponential smoothing rate for orientation, 1/s (default: 10)
    pub rotation_smooth: f64,

    /// X coordinate of each ghost lane; empty keeps the interpolated X
    pub ghost_lanes: Vec<f64>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            position_smooth: 10.0,
            rotation_smooth: 10.0,
            ghost_lanes: Vec::new(),
        }
    }
}

impl ConsumerConfig {
    /// Checks both smoothing rates are finite and non-negative.
    pub fn validate(&self) -> Result<(), SyncError> {
        for rate in [self.position_smooth, self.rotation_smooth] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(SyncError::InvalidSmoothing(rate));
            }
        }
        Ok(())
    }
}

/// Full configuration, as stored in a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostSyncConfig {
    pub reader: ReaderConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

impl GhostSyncConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SyncError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), SyncError> {
        self.reader.validate()?;
        self.producer.validate()?;
        self.consumer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GhostSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reader.capacity, 256);
        assert_eq!(config.producer.lanes, vec![-3.0, 0.0, 3.0]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "reader": { "simulated_lag": 0.5, "terminal_lane": "carry_forward" },
            "consumer": { "ghost_lanes": [-7.0, -4.0, -1.0] }
        }"#;
        let config = GhostSyncConfig::from_json_str(json).unwrap();

        assert_eq!(config.reader.simulated_lag, 0.5);
        assert_eq!(config.reader.capacity, 256);
        assert_eq!(config.reader.terminal_lane, TerminalLanePolicy::CarryForward);
        assert_eq!(config.consumer.ghost_lanes, vec![-7.0, -4.0, -1.0]);
        assert_eq!(config.producer.sample_period, 0.02);
    }

    #[test]
    fn test_negative_lag_rejected() {
        let json = r#"{ "reader": { "simulated_lag": -1.0 } }"#;
        let err = GhostSyncConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, SyncError::InvalidLag(_)));
    }

    #[test]
    fn test_producer_validation() {
        let mut producer = ProducerConfig::default();
        producer.sample_period = 0.0;
        assert!(matches!(
            producer.validate(),
            Err(SyncError::InvalidSamplePeriod(_))
        ));

        let mut producer = ProducerConfig::default();
        producer.lanes.clear();
        assert!(matches!(producer.validate(), Err(SyncError::EmptyLaneSet)));
    }

    #[test]
    fn test_consumer_validation() {
        let mut consumer = ConsumerConfig::default();
        consumer.rotation_smooth = f64::NAN;
        assert!(matches!(
            consumer.validate(),
            Err(SyncError::InvalidSmoothing(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = GhostSyncConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GhostSyncConfig::from_json_file("/nonexistent/ghostsync.json").unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
