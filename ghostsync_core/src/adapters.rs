//! Adapters - the producer, consumer and terminal-event call sites.
//!
//! These are the three places a game loop touches the delayed reader:
//!
//! ```text
//!   PoseSource ──► PoseSampler ──record──►┌────────────────────┐
//!                                         │ DelayedStateReader │──query──► GhostFollower ──► GhostView
//!   collision ──► TerminalEventReporter ─►└────────────────────┘
//! ```
//!
//! Each adapter receives its [`SharedReader`] and clock at construction;
//! nothing is looked up globally.

use crate::config::{ConsumerConfig, ProducerConfig};
use crate::error::SyncError;
use crate::sync_reader::SharedReader;
use crate::sync_state::{Pose, StateSample};

use ghostsync_env::SyncClock;
use nalgebra::{UnitQuaternion, Vector3};
use std::sync::Arc;
use tracing::info;

/// Live agent whose pose the producer samples.
pub trait PoseSource {
    /// Current world position.
    fn position(&self) -> Vector3<f64>;

    /// Current world orientation.
    fn orientation(&self) -> UnitQuaternion<f64>;

    /// Both, as a [`Pose`].
    fn pose(&self) -> Pose {
        Pose::new(self.position(), self.orientation())
    }
}

/// Index of the lane whose X coordinate is closest to `x`.
///
/// The first lane wins ties. `None` for an empty lane set or a NaN `x`.
pub fn nearest_lane(lanes: &[f64], x: f64) -> Option<usize> {
    if x.is_nan() {
        return None;
    }
    lanes
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, lane)| {
            let diff = (x - lane).abs();
            match best {
                Some((_, best_diff)) if best_diff <= diff => best,
                _ => Some((i, diff)),
            }
        })
        .map(|(i, _)| i)
}

/// Producer: samples a [`PoseSource`] at a fixed period into the reader.
pub struct PoseSampler<C: SyncClock> {
    clock: Arc<C>,
    reader: SharedReader,
    config: ProducerConfig,
    next_sample: f64,
    samples_recorded: u64,
}

impl<C: SyncClock> PoseSampler<C> {
    /// Creates a sampler. The first `tick` records immediately.
    pub fn new(clock: Arc<C>, reader: SharedReader, config: ProducerConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            clock,
            reader,
            config,
            next_sample: 0.0,
            samples_recorded: 0,
        })
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    pub fn samples_recorded(&self) -> u64 {
        self.samples_recorded
    }

    /// Records a sample if the sampling period has elapsed.
    ///
    /// Returns `true` when a sample was recorded this call.
    pub fn tick(&mut self, source: &impl PoseSource) -> bool {
        let now = self.clock.now_secs();
        if now < self.next_sample {
            return false;
        }
        self.next_sample = now + self.config.sample_period;

        let sample = self.capture(source, now);
        self.reader.borrow_mut().record(sample);
        self.samples_recorded += 1;
        true
    }

    fn capture(&self, source: &impl PoseSource, now: f64) -> StateSample {
        let pose = source.pose();
        // Unknown positions fall back to the middle lane
        let lane_index = nearest_lane(&self.config.lanes, pose.position.x)
            .unwrap_or(self.config.lanes.len() / 2);
        let grounded =
            (pose.position.y - self.config.ground_height).abs() < self.config.ground_tolerance;

        StateSample {
            timestamp: now,
            pose,
            lane_index,
            grounded,
            crashed: false,
        }
    }
}

/// What the consumer renders this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostView {
    /// Smoothed position (X snapped to the ghost lane when configured)
    pub position: Vector3<f64>,

    /// Smoothed orientation
    pub orientation: UnitQuaternion<f64>,

    pub lane_index: usize,
    pub grounded: bool,
    pub crashed: bool,

    /// Unsmoothed sample returned by the reader
    pub sample: StateSample,
}

/// Consumer: pulls the delayed state each frame and smooths it.
pub struct GhostFollower<C: SyncClock> {
    clock: Arc<C>,
    reader: SharedReader,
    config: ConsumerConfig,
    smoothed: Option<Pose>,
    was_crashed: bool,
}

impl<C: SyncClock> GhostFollower<C> {
    pub fn new(clock: Arc<C>, reader: SharedReader, config: ConsumerConfig) -> Result<Self, SyncError> {
        config.validate()?;
        Ok(Self {
            clock,
            reader,
            config,
            smoothed: None,
            was_crashed: false,
        })
    }

    /// Last smoothed pose, if any frame has been rendered.
    pub fn smoothed_pose(&self) -> Option<Pose> {
        self.smoothed
    }

    /// Queries the reader and advances smoothing by `dt` seconds.
    ///
    /// Returns `None` (skip this frame) until the reader has data.
    pub fn update(&mut self, dt: f64) -> Option<GhostView> {
        let now = self.clock.now_secs();
        let sample = self.reader.borrow_mut().query(now)?;

        let mut target = sample.position();
        if let Some(lane_x) = self.config.ghost_lanes.get(sample.lane_index) {
            target.x = *lane_x;
        }

        let pose = match self.smoothed {
            None => Pose::new(target, sample.pose.orientation),
            Some(prev) => {
                let pos_t = smoothing_factor(self.config.position_smooth, dt);
                let rot_t = smoothing_factor(self.config.rotation_smooth, dt);
                let position = prev.position.lerp(&target, pos_t);
                let orientation = Pose::interpolate(&prev, &sample.pose, rot_t).orientation;
                Pose::new(position, orientation)
            }
        };
        self.smoothed = Some(pose);

        if sample.crashed && !self.was_crashed {
            info!(time = sample.timestamp, lane = sample.lane_index, "Ghost crashed");
        }
        self.was_crashed = sample.crashed;

        Some(GhostView {
            position: pose.position,
            orientation: pose.orientation,
            lane_index: sample.lane_index,
            grounded: sample.grounded,
            crashed: sample.crashed,
            sample,
        })
    }
}

/// `1 - exp(-rate * dt)`, the frame-rate independent blend factor.
pub fn smoothing_factor(rate: f64, dt: f64) -> f64 {
    (1.0 - (-rate * dt.max(0.0)).exp()).clamp(0.0, 1.0)
}

/// Terminal-event call site used by collision resolution.
pub struct TerminalEventReporter<C: SyncClock> {
    clock: Arc<C>,
    reader: SharedReader,
    reported: u64,
}

impl<C: SyncClock> TerminalEventReporter<C> {
    pub fn new(clock: Arc<C>, reader: SharedReader) -> Self {
        Self {
            clock,
            reader,
            reported: 0,
        }
    }

    /// Records one terminal collision at the current clock time.
    pub fn report(&mut self, pose: Pose) {
        let now = self.clock.now_secs();
        self.reader.borrow_mut().record_terminal_event(pose, now);
        self.reported += 1;
    }

    pub fn reported(&self) -> u64 {
        self.reported
    }
}
