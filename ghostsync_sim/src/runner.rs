//! Scenario runner - drives the runner oracle, the delayed reader and the
//! ghost follower frame by frame and checks the ghost against ground truth.

use crate::clock::SimClock;
use crate::error::SimError;
use crate::exporter::{GhostFrame, SimEvent, SimExport, SimFrame, TruthPosition};
use crate::oracle::{Collision, RunnerConfig, RunnerOracle};
use crate::scenarios::{ScenarioId, ScenarioPlan};

use ghostsync_core::{
    DelayedStateReader, GhostFollower, GhostSyncConfig, GhostView, PoseSampler, PoseSource,
    QueryStats, TerminalEventReporter,
};
use ghostsync_env::SyncClock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info, warn};

/// Max RMS position error (world units) for tracking scenarios.
const RMS_THRESHOLD: f64 = 0.25;

/// Max fraction of compared frames where the ghost lane differs from truth.
const LANE_MISMATCH_THRESHOLD: f64 = 0.15;

/// Min fraction of stale queries when the lag exceeds the retained window.
const STALE_THRESHOLD: f64 = 0.9;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total frames executed
    pub total_frames: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Frames simulated
    pub frames: u64,

    /// Regular samples recorded by the producer
    pub samples_recorded: u64,

    /// Terminal events recorded on collision
    pub terminal_events: u64,

    /// Frames where the ghost was compared against truth
    pub compared_frames: u64,

    /// Compared frames whose ghost lane differed from the truth lane
    pub lane_mismatch_frames: u64,

    /// Ghost frames whose lane index was outside the lane set
    pub invalid_lane_frames: u64,

    /// Ghost frames reported as not grounded
    pub airborne_frames: u64,

    /// RMS of the unsmoothed ghost position error
    pub rms_error: f64,

    /// Largest single-frame position error
    pub max_error: f64,

    /// Highest Y the ghost reached
    pub max_ghost_height: f64,

    /// Seconds from each collision to the ghost's crash
    pub crash_delays: Vec<f64>,

    /// Reader counters at the end of the run
    pub query_stats: QueryStats,
}

impl ScenarioMetrics {
    /// Fraction of compared frames with a lane mismatch.
    pub fn lane_mismatch_fraction(&self) -> f64 {
        if self.compared_frames == 0 {
            return 0.0;
        }
        self.lane_mismatch_frames as f64 / self.compared_frames as f64
    }

    /// Fraction of queries that fell behind the retained window.
    pub fn stale_fraction(&self) -> f64 {
        if self.query_stats.queries == 0 {
            return 0.0;
        }
        self.query_stats.stale as f64 / self.query_stats.queries as f64
    }
}

/// Runs ghost playback scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Frame rate in Hz
    frame_rate_hz: u32,

    /// Simulated duration in seconds
    duration_secs: f64,

    /// Reader, producer and consumer settings
    config: GhostSyncConfig,

    /// Runner physics
    runner_config: RunnerConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with default settings.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            frame_rate_hz: 60,
            duration_secs: 10.0,
            config: GhostSyncConfig::default(),
            runner_config: RunnerConfig::default(),
        }
    }

    /// Sets the frame rate.
    pub fn with_frame_rate(mut self, hz: u32) -> Self {
        self.frame_rate_hz = hz.max(1);
        self
    }

    /// Sets the simulated duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs.max(0.0);
        self
    }

    /// Replaces the reader/producer/consumer configuration.
    pub fn with_config(mut self, config: GhostSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the runner physics.
    pub fn with_runner_config(mut self, runner_config: RunnerConfig) -> Self {
        self.runner_config = runner_config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.execute(scenario, None)
    }

    /// Runs a scenario, capturing every `export_interval`-th frame.
    pub fn run_with_export(
        &self,
        scenario: ScenarioId,
        export_interval: u64,
    ) -> Result<(ScenarioResult, SimExport), SimError> {
        let mut export = SimExport::new(scenario.name(), self.seed);
        let result = self.execute(scenario, Some((&mut export, export_interval.max(1))))?;
        export.finalize(result.passed, Some(result.metrics.rms_error));
        Ok((result, export))
    }

    fn execute(
        &self,
        scenario: ScenarioId,
        mut export: Option<(&mut SimExport, u64)>,
    ) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        let plan = scenario.plan();

        let mut config = self.config.clone();
        if let Some(lag) = plan.lag {
            config.reader.simulated_lag = lag;
        }
        if let Some(capacity) = plan.capacity {
            config.reader.capacity = capacity;
        }
        config.validate()?;

        // Truth must reach back at least as far as the reader does
        let mut runner_config = self.runner_config.clone();
        runner_config.history_secs = runner_config.history_secs.max(config.reader.simulated_lag + 1.0);
        let mut oracle = RunnerOracle::new(runner_config, self.seed);
        for hazard in &plan.hazards {
            oracle.add_hazard(*hazard);
        }
        // Producer lanes must agree with the runner's lanes
        config.producer.lanes = oracle.lanes().to_vec();

        let clock = SimClock::shared();
        let reader = DelayedStateReader::from_config(&config.reader)?.into_shared();
        let mut sampler = PoseSampler::new(clock.clone(), reader.clone(), config.producer.clone())?;
        let mut follower = GhostFollower::new(clock.clone(), reader.clone(), config.consumer.clone())?;
        let mut reporter = TerminalEventReporter::new(clock.clone(), reader.clone());

        let lag = config.reader.simulated_lag;
        let base_dt = 1.0 / self.frame_rate_hz as f64;
        let total_frames = (self.duration_secs * self.frame_rate_hz as f64).round() as u64;

        // Frame time noise comes from its own stream so input stays reproducible
        let mut jitter_rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(0x9e3779b97f4a7c15));
        let jitter = Normal::new(0.0, plan.frame_jitter * base_dt).ok();

        let mut metrics = ScenarioMetrics::default();
        let mut sq_error_sum = 0.0;
        let mut collisions: Vec<Collision> = Vec::new();
        let mut ghost_crashes: Vec<f64> = Vec::new();
        let mut was_crashed = false;
        let mut first_sample: Option<f64> = None;

        for frame in 0..total_frames {
            apply_inputs(&mut oracle, &plan);

            let dt = match &jitter {
                Some(normal) if plan.frame_jitter > 0.0 => {
                    (base_dt + normal.sample(&mut jitter_rng)).max(0.25 * base_dt)
                }
                _ => base_dt,
            };

            let hits = oracle.step(dt);
            clock.set_secs(oracle.time());
            if sampler.tick(&oracle) && first_sample.is_none() {
                first_sample = Some(clock.now_secs());
            }

            for hit in &hits {
                warn!(
                    time = hit.time,
                    lane = hit.hazard.lane,
                    lives_left = hit.lives_left,
                    "Runner hit a hazard"
                );
                reporter.report(hit.pose);
            }
            collisions.extend(hits.iter().copied());

            let view = follower.update(dt);
            let now = oracle.time();
            metrics.frames += 1;

            if let Some(view) = &view {
                let comparable = first_sample.is_some_and(|t| view.sample.timestamp >= t);
                observe(&oracle, view, comparable, &mut metrics, &mut sq_error_sum);
                // Warm-up frames fall back to the newest sample, which may be
                // a crash recorded this very frame
                if comparable && view.crashed && !was_crashed {
                    ghost_crashes.push(now);
                }
                was_crashed = view.crashed;
            }

            if let Some((export, interval)) = export.as_mut() {
                if frame % *interval == 0 || !hits.is_empty() {
                    export.add_frame(build_frame(&oracle, view.as_ref(), &hits));
                }
            }

            if frame % self.frame_rate_hz as u64 == 0 {
                debug!(
                    "  t={:.1}s | samples={} | lives={}",
                    now,
                    sampler.samples_recorded(),
                    oracle.lives()
                );
            }
        }

        metrics.samples_recorded = sampler.samples_recorded();
        metrics.terminal_events = reporter.reported();
        metrics.query_stats = reader.borrow().stats();
        if metrics.compared_frames > 0 {
            metrics.rms_error = (sq_error_sum / metrics.compared_frames as f64).sqrt();
        }

        let period = config.producer.sample_period;
        let failure_reason = match scenario {
            ScenarioId::SteadyRun | ScenarioId::Jitter => check_rms(&metrics),
            ScenarioId::LaneWeave => check_rms(&metrics).or_else(|| check_lanes(&metrics)),
            ScenarioId::Hurdles => check_airborne(&metrics),
            ScenarioId::Crash => {
                let window = (lag - period - base_dt, lag + period + 2.0 * base_dt);
                check_crashes(&collisions, &ghost_crashes, window, &mut metrics)
            }
            ScenarioId::TimeLapse => check_stale(&metrics),
        };

        info!(
            "Scenario {} finished: rms={:.4} max={:.4} compared={} stale={}",
            scenario.name(),
            metrics.rms_error,
            metrics.max_error,
            metrics.compared_frames,
            metrics.query_stats.stale
        );

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            total_frames,
            final_time_secs: oracle.time(),
            failure_reason,
            metrics,
        })
    }
}

/// Compares one ghost frame against the truth at its sample time.
///
/// Frames whose sample time precedes the first recording only count
/// toward height and airborne metrics.
fn observe(
    oracle: &RunnerOracle,
    view: &GhostView,
    comparable: bool,
    metrics: &mut ScenarioMetrics,
    sq_error_sum: &mut f64,
) {
    let ghost_pos = view.sample.position();
    metrics.max_ghost_height = metrics.max_ghost_height.max(ghost_pos.y);
    if !view.grounded {
        metrics.airborne_frames += 1;
    }
    if view.lane_index >= oracle.lanes().len() {
        metrics.invalid_lane_frames += 1;
    }

    if !comparable {
        return;
    }
    let Some(truth) = oracle.truth_at(view.sample.timestamp) else {
        return;
    };
    let error = (ghost_pos - truth.pose.position).norm();
    *sq_error_sum += error * error;
    metrics.max_error = metrics.max_error.max(error);
    metrics.compared_frames += 1;

    if !view.crashed && view.lane_index != oracle.lane_of(&truth) {
        metrics.lane_mismatch_frames += 1;
    }
}

fn apply_inputs(oracle: &mut RunnerOracle, plan: &ScenarioPlan) {
    if plan.lane_change_chance > 0.0 && oracle.chance(plan.lane_change_chance) {
        oracle.random_lane_change();
    }
    if plan.jump_chance > 0.0 && oracle.chance(plan.jump_chance) {
        oracle.jump();
    }
}

fn build_frame(oracle: &RunnerOracle, view: Option<&GhostView>, hits: &[Collision]) -> SimFrame {
    SimFrame {
        time_sec: oracle.time(),
        truth: TruthPosition::new(oracle.position(), oracle.current_lane(), oracle.is_grounded()),
        ghost: view.map(GhostFrame::from_view),
        events: hits
            .iter()
            .map(|c| SimEvent {
                message: format!("collision at z={:.1} lane={}", c.hazard.z, c.hazard.lane),
                level: Some("warn".to_string()),
            })
            .collect(),
    }
}

fn check_rms(metrics: &ScenarioMetrics) -> Option<String> {
    if metrics.compared_frames == 0 {
        return Some("No ghost frames were compared against truth".to_string());
    }
    if metrics.rms_error >= RMS_THRESHOLD {
        return Some(format!(
            "RMS error {:.3} exceeds threshold {:.2}",
            metrics.rms_error, RMS_THRESHOLD
        ));
    }
    None
}

fn check_lanes(metrics: &ScenarioMetrics) -> Option<String> {
    if metrics.invalid_lane_frames > 0 {
        return Some(format!(
            "{} frames had a lane index outside the lane set",
            metrics.invalid_lane_frames
        ));
    }
    let fraction = metrics.lane_mismatch_fraction();
    if fraction >= LANE_MISMATCH_THRESHOLD {
        return Some(format!(
            "Lane mismatch in {:.1}% of frames (limit {:.0}%)",
            fraction * 100.0,
            LANE_MISMATCH_THRESHOLD * 100.0
        ));
    }
    None
}

fn check_airborne(metrics: &ScenarioMetrics) -> Option<String> {
    if metrics.airborne_frames == 0 {
        return Some("Ghost never left the ground".to_string());
    }
    if metrics.max_ghost_height <= 1.0 {
        return Some(format!(
            "Ghost peak height {:.2} too low",
            metrics.max_ghost_height
        ));
    }
    None
}

fn check_stale(metrics: &ScenarioMetrics) -> Option<String> {
    if metrics.query_stats.unavailable > 0 {
        return Some(format!(
            "{} queries returned nothing",
            metrics.query_stats.unavailable
        ));
    }
    let fraction = metrics.stale_fraction();
    if fraction <= STALE_THRESHOLD {
        return Some(format!(
            "Only {:.1}% of queries were stale",
            fraction * 100.0
        ));
    }
    None
}

/// Pairs each collision with the next ghost crash and checks the delay.
fn check_crashes(
    collisions: &[Collision],
    ghost_crashes: &[f64],
    window: (f64, f64),
    metrics: &mut ScenarioMetrics,
) -> Option<String> {
    if collisions.is_empty() {
        return Some("Runner never hit a hazard".to_string());
    }

    let mut crashes = ghost_crashes.iter().copied().peekable();
    for collision in collisions {
        while crashes.peek().is_some_and(|&t| t < collision.time) {
            crashes.next();
        }
        let Some(crash_time) = crashes.next() else {
            return Some(format!(
                "Collision at t={:.3} never reached the ghost",
                collision.time
            ));
        };

        let delay = crash_time - collision.time;
        metrics.crash_delays.push(delay);
        if delay < window.0 || delay > window.1 {
            return Some(format!(
                "Crash delay {:.3}s outside [{:.3}, {:.3}]",
                delay, window.0, window.1
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_steady_run_tracks_truth() {
        let result = ScenarioRunner::new(42).run(ScenarioId::SteadyRun).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_frames, 600);
        assert!(result.metrics.compared_frames > 500);
        assert!(result.metrics.rms_error < 0.05);
        assert_eq!(result.metrics.terminal_events, 0);
    }

    #[test]
    fn test_crash_reaches_ghost_after_lag() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Crash).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.terminal_events, 3);
        assert_eq!(result.metrics.crash_delays.len(), 3);
        for delay in &result.metrics.crash_delays {
            assert!(*delay > 0.0);
        }
    }

    #[test]
    fn test_crash_with_lag_longer_than_first_collision() {
        let mut config = GhostSyncConfig::default();
        config.reader.simulated_lag = 2.0;
        let result = ScenarioRunner::new(42)
            .with_config(config)
            .run(ScenarioId::Crash)
            .unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.query_stats.stale > 0);
        assert_eq!(result.metrics.crash_delays.len(), 3);
        for delay in &result.metrics.crash_delays {
            assert!(*delay > 1.9, "delay {}", delay);
        }
    }

    #[test]
    fn test_jitter_keeps_error_bound() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Jitter).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.compared_frames > 0);
        assert!(result.metrics.rms_error < RMS_THRESHOLD);
    }

    #[test]
    fn test_hurdles_reach_the_ghost() {
        let result = ScenarioRunner::new(11).run(ScenarioId::Hurdles).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.airborne_frames > 0);
        assert!(result.metrics.max_ghost_height > 1.0);
    }

    #[test]
    fn test_time_lapse_degrades_to_stale() {
        let result = ScenarioRunner::new(1)
            .with_duration(2.0)
            .run(ScenarioId::TimeLapse)
            .unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.query_stats.unavailable, 0);
        assert_relative_eq!(result.metrics.stale_fraction(), 1.0);
    }

    #[test]
    fn test_lane_weave_snaps_lanes() {
        let result = ScenarioRunner::new(5).run(ScenarioId::LaneWeave).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.invalid_lane_frames, 0);
        assert!(result.metrics.lane_mismatch_fraction() < LANE_MISMATCH_THRESHOLD);
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let runner = ScenarioRunner::new(99).with_duration(3.0);
        let a = runner.run(ScenarioId::Jitter).unwrap();
        let b = runner.run(ScenarioId::Jitter).unwrap();
        assert_eq!(a.metrics.rms_error, b.metrics.rms_error);
        assert_eq!(a.final_time_secs, b.final_time_secs);
        assert_eq!(a.metrics.samples_recorded, b.metrics.samples_recorded);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let mut config = GhostSyncConfig::default();
        config.producer.sample_period = -1.0;
        let err = ScenarioRunner::new(1)
            .with_config(config)
            .run(ScenarioId::SteadyRun)
            .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn test_export_captures_frames() {
        let (result, export) = ScenarioRunner::new(3)
            .with_duration(1.0)
            .run_with_export(ScenarioId::SteadyRun, 10)
            .unwrap();
        assert_eq!(export.frames.len(), 6);
        assert_eq!(export.passed, result.passed);
        assert!(export.final_rms_error.is_some());
    }

    #[test]
    fn test_crash_check_rejects_late_ghost() {
        let collision = Collision {
            time: 1.0,
            pose: ghostsync_core::Pose::at(nalgebra::Vector3::zeros()),
            hazard: crate::oracle::Hazard::new(10.0, 1),
            lives_left: 2,
        };
        let mut metrics = ScenarioMetrics::default();
        assert!(check_crashes(&[collision], &[1.15], (0.1, 0.2), &mut metrics).is_none());

        let mut metrics = ScenarioMetrics::default();
        assert!(check_crashes(&[collision], &[1.5], (0.1, 0.2), &mut metrics).is_some());
        assert!(check_crashes(&[collision], &[], (0.1, 0.2), &mut metrics).is_some());
    }
}
