//! JSON exporter for offline playback analysis.
//!
//! Exports simulation frames (truth vs ghost) as a single JSON document.

use crate::error::SimError;
use ghostsync_core::GhostView;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Live runner state
    pub truth: TruthPosition,

    /// Ghost state, absent until the reader has data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghost: Option<GhostFrame>,

    /// Events (collisions)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<SimEvent>,
}

/// Position of the live runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub lane: usize,
    pub grounded: bool,
}

impl TruthPosition {
    pub fn new(pos: Vector3<f64>, lane: usize, grounded: bool) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            lane,
            grounded,
        }
    }
}

/// Ghost frame data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostFrame {
    /// Smoothed render position
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Time the reader interpolated at
    pub sample_time: f64,
    pub lane: usize,
    pub grounded: bool,
    pub crashed: bool,
}

impl GhostFrame {
    pub fn from_view(view: &GhostView) -> Self {
        Self {
            x: view.position.x,
            y: view.position.y,
            z: view.position.z,
            sample_time: view.sample.timestamp,
            lane: view.lane_index,
            grounded: view.grounded,
            crashed: view.crashed,
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Final RMS error if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_rms_error: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            final_rms_error: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, rms_error: Option<f64>) {
        self.passed = passed;
        self.final_rms_error = rms_error;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: f64) -> SimFrame {
        SimFrame {
            time_sec: t,
            truth: TruthPosition::new(Vector3::new(0.0, 0.0, t * 10.0), 1, true),
            ghost: None,
            events: Vec::new(),
        }
    }

    #[test]
    fn test_add_frame_tracks_duration() {
        let mut export = SimExport::new("steady_run", 42);
        export.add_frame(frame(0.5));
        export.add_frame(frame(1.0));
        export.finalize(true, Some(0.01));

        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.duration_sec, 1.0);
        assert!(export.passed);
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let json = serde_json::to_string(&frame(0.0)).unwrap();
        assert!(!json.contains("ghost"));
        assert!(!json.contains("events"));
        assert!(json.contains("\"lane\":1"));
    }

    #[test]
    fn test_write_to_bad_path_is_io_error() {
        let export = SimExport::new("crash", 1);
        let err = export
            .write_to_file("/nonexistent/dir/export.json")
            .unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
