//! State samples - the timestamped pose records stored by the buffer.
//!
//! A sample mixes continuous fields (position, orientation) with categorical
//! ones (lane index, grounded/crashed flags). Only the continuous part lives
//! in [`Pose`], and [`Pose::interpolate`] is the single blending routine, so
//! lanes and flags cannot be averaged by accident.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Threshold below which two rotations are treated as identical for slerp.
const SLERP_EPSILON: f64 = 1.0e-9;

/// Continuous part of a sample: where the agent is and how it is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position [x, y, z] in world units
    pub position: Vector3<f64>,

    /// Orientation as a unit quaternion
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Creates a pose from a position and orientation.
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates an unrotated pose at the given position.
    pub fn at(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// Blends two poses: linear for position, spherical for orientation.
    ///
    /// `t` is clamped to `[0, 1]`. When the rotations are too close for
    /// slerp to be well defined, normalized lerp is used instead.
    pub fn interpolate(a: &Pose, b: &Pose, t: f64) -> Pose {
        let t = t.clamp(0.0, 1.0);
        let position = a.position.lerp(&b.position, t);
        let orientation = a
            .orientation
            .try_slerp(&b.orientation, t, SLERP_EPSILON)
            .unwrap_or_else(|| a.orientation.nlerp(&b.orientation, t));

        Pose {
            position,
            orientation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vector3::zeros())
    }
}

/// One timestamped observation of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSample {
    /// Capture time in seconds on the producer's clock
    pub timestamp: f64,

    /// Pose snapshot
    pub pose: Pose,

    /// Discrete lateral lane occupied at capture time
    pub lane_index: usize,

    /// Agent was on the ground
    pub grounded: bool,

    /// Agent was in a terminal (crashed) state
    pub crashed: bool,
}

impl StateSample {
    /// Creates a grounded, non-crashed sample.
    pub fn new(timestamp: f64, pose: Pose, lane_index: usize) -> Self {
        Self {
            timestamp,
            pose,
            lane_index,
            grounded: true,
            crashed: false,
        }
    }

    /// Sets the grounded flag.
    pub fn with_grounded(mut self, grounded: bool) -> Self {
        self.grounded = grounded;
        self
    }

    /// Sets the crashed flag.
    pub fn with_crashed(mut self, crashed: bool) -> Self {
        self.crashed = crashed;
        self
    }

    /// Shortcut for the sample position.
    pub fn position(&self) -> Vector3<f64> {
        self.pose.position
    }
}

/// Fraction of the way `value` lies between `a` and `b`, clamped to `[0, 1]`.
///
/// Returns 0 for an empty or inverted interval.
pub fn inverse_lerp(a: f64, b: f64, value: f64) -> f64 {
    let span = b - a;
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    ((value - a) / span).clamp(0.0, 1.0)
}
