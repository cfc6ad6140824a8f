//! The delayed reader - lag-simulation read policy over the ring buffer.
//!
//! Every query looks `simulated_lag` seconds into the past, finds the
//! bracketing samples and blends them. Terminal events are written at the
//! current (unlagged) time so they enter the stream as early as possible.

use crate::config::{ReaderConfig, TerminalLanePolicy};
use crate::error::SyncError;
use crate::sync_buffer::{BracketKind, SyncBuffer};
use crate::sync_state::{Pose, StateSample};

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Single-threaded shared handle handed to the producer and consumer adapters.
pub type SharedReader = Rc<RefCell<DelayedStateReader>>;

/// Counters for how queries were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Total `query` calls
    pub queries: u64,

    /// Queries made before anything was recorded
    pub unavailable: u64,

    /// Queries blended between two samples
    pub interpolated: u64,

    /// Queries at or past the newest sample
    pub clamped: u64,

    /// Queries that collapsed to an exact hit
    pub degenerate: u64,

    /// Queries older than the retained window
    pub stale: u64,
}

impl QueryStats {
    fn count(&mut self, kind: Option<BracketKind>) {
        self.queries += 1;
        match kind {
            None => self.unavailable += 1,
            Some(BracketKind::Interpolated) => self.interpolated += 1,
            Some(BracketKind::Clamped) => self.clamped += 1,
            Some(BracketKind::Degenerate) => self.degenerate += 1,
            Some(BracketKind::Stale) => self.stale += 1,
        }
    }
}

/// Ring buffer plus a simulated read latency.
#[derive(Debug, Clone)]
pub struct DelayedStateReader {
    buffer: SyncBuffer,
    simulated_lag: f64,
    terminal_lane: TerminalLanePolicy,
    last_lane: Option<usize>,
    stats: QueryStats,
}

impl DelayedStateReader {
    /// Creates a reader. A negative or NaN lag is treated as zero.
    pub fn new(simulated_lag: f64, capacity: usize) -> Self {
        Self {
            buffer: SyncBuffer::new(capacity),
            simulated_lag: sanitize_lag(simulated_lag),
            terminal_lane: TerminalLanePolicy::default(),
            last_lane: None,
            stats: QueryStats::default(),
        }
    }

    /// Creates a reader from validated configuration.
    pub fn from_config(config: &ReaderConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let mut reader = Self::new(config.simulated_lag, config.capacity);
        reader.terminal_lane = config.terminal_lane;
        Ok(reader)
    }

    /// Creates an Rc-wrapped reader for sharing between adapters.
    pub fn shared(simulated_lag: f64, capacity: usize) -> SharedReader {
        Rc::new(RefCell::new(Self::new(simulated_lag, capacity)))
    }

    /// Sets how terminal events pick their lane.
    pub fn with_terminal_lane(mut self, policy: TerminalLanePolicy) -> Self {
        self.terminal_lane = policy;
        self
    }

    /// Wraps the reader in a [`SharedReader`].
    pub fn into_shared(self) -> SharedReader {
        Rc::new(RefCell::new(self))
    }

    pub fn simulated_lag(&self) -> f64 {
        self.simulated_lag
    }

    /// Changes the read delay. A negative or NaN lag is treated as zero.
    pub fn set_simulated_lag(&mut self, lag: f64) {
        self.simulated_lag = sanitize_lag(lag);
    }

    pub fn buffer(&self) -> &SyncBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Appends a sample to the buffer.
    pub fn record(&mut self, sample: StateSample) {
        self.last_lane = Some(sample.lane_index);
        self.buffer.push(sample);
    }

    /// Returns the interpolated state at `now - simulated_lag`.
    ///
    /// `None` until at least one sample has been recorded. The lane comes
    /// from the lower bracket only; grounded/crashed are OR-ed across both
    /// brackets so a short-lived `true` survives the blend.
    pub fn query(&mut self, now: f64) -> Option<StateSample> {
        let target_time = now - self.simulated_lag;
        let bracket = self.buffer.find_bracket(target_time);
        self.stats.count(bracket.map(|b| b.kind));
        let bracket = bracket?;

        match bracket.kind {
            BracketKind::Stale => debug!(
                target_time,
                newest = bracket.lower.timestamp,
                "Query older than retained window, using newest sample"
            ),
            BracketKind::Degenerate => trace!(
                target_time,
                lower = bracket.lower.timestamp,
                "No valid forward sample, treating as exact"
            ),
            _ => {}
        }

        let (lower, upper) = (bracket.lower, bracket.upper);
        Some(StateSample {
            timestamp: target_time,
            pose: Pose::interpolate(&lower.pose, &upper.pose, bracket.t),
            lane_index: lower.lane_index,
            grounded: lower.grounded || upper.grounded,
            crashed: lower.crashed || upper.crashed,
        })
    }

    /// Records a crash at the current, unlagged time.
    ///
    /// The sample is grounded and crashed. Its lane follows the configured
    /// [`TerminalLanePolicy`].
    pub fn record_terminal_event(&mut self, pose: Pose, now: f64) {
        let lane_index = match self.terminal_lane {
            TerminalLanePolicy::Placeholder => 0,
            TerminalLanePolicy::CarryForward => self.last_lane.unwrap_or(0),
        };
        debug!(now, lane_index, "Recording terminal event");

        self.record(StateSample {
            timestamp: now,
            pose,
            lane_index,
            grounded: true,
            crashed: true,
        });
    }

    /// Drops all samples and counters. Lag and capacity are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_lane = None;
        self.stats = QueryStats::default();
    }
}

fn sanitize_lag(lag: f64) -> f64 {
    if lag.is_finite() && lag > 0.0 {
        lag
    } else {
        0.0
    }
}
