//! Ground truth oracle for simulation.
//!
//! The Oracle is the live lane runner that the ghost follows:
//! - Lateral movement between three lanes with a cooldown
//! - Jump physics (impulse + gravity, landing on the ground plane)
//! - Constant forward speed with a rolling orientation
//! - Hazards that cost a life unless jumped over
//! - A truth history for comparing the delayed view against

use ghostsync_core::adapters::{nearest_lane, PoseSource};
use ghostsync_core::Pose;
use nalgebra::{UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Runner tuning.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// X of the middle lane
    pub mid_x: f64,

    /// Lateral distance between lanes
    pub move_step: f64,

    /// Lateral speed while changing lanes (units/s)
    pub move_speed: f64,

    /// Minimum seconds between lane changes
    pub move_cooldown: f64,

    /// Vertical acceleration (negative is down)
    pub gravity: f64,

    /// Initial vertical velocity of a jump
    pub jump_force: f64,

    /// Forward speed along +Z (units/s)
    pub base_speed: f64,

    /// Radius used to turn distance travelled into roll
    pub roll_radius: f64,

    /// Starting lives
    pub lives: u32,

    /// Seconds of truth history kept for `truth_at`
    pub history_secs: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            mid_x: 0.0,
            move_step: 3.0,
            move_speed: 15.0,
            move_cooldown: 0.1,
            gravity: -9.81,
            jump_force: 10.0,
            base_speed: 10.0,
            roll_radius: 0.5,
            lives: 3,
            history_secs: 10.0,
        }
    }
}

/// An obstacle sitting in one lane at a given Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub z: f64,
    pub lane: usize,

    /// Runner clears the hazard if at least this high
    pub height: f64,
}

impl Hazard {
    pub fn new(z: f64, lane: usize) -> Self {
        Self {
            z,
            lane,
            height: 0.8,
        }
    }
}

/// A collision reported by [`RunnerOracle::step`].
#[derive(Debug, Clone, Copy)]
pub struct Collision {
    pub time: f64,
    pub pose: Pose,
    pub hazard: Hazard,
    pub lives_left: u32,
}

/// One entry of the truth history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthFrame {
    pub time: f64,
    pub pose: Pose,
    pub grounded: bool,
}

/// The Oracle - maintains ground truth for the runner.
pub struct RunnerOracle {
    config: RunnerConfig,
    lanes: Vec<f64>,

    /// RNG for scripted-random input
    rng: ChaCha8Rng,

    position: Vector3<f64>,
    target_lane: usize,
    vertical_velocity: f64,
    grounded: bool,
    yaw: f64,
    next_allowed_move: f64,

    hazards: Vec<Hazard>,
    lives: u32,

    /// Current simulation time (seconds)
    current_time: f64,

    history: VecDeque<TruthFrame>,
}

impl RunnerOracle {
    /// Creates a runner in the middle lane at the origin.
    pub fn new(config: RunnerConfig, seed: u64) -> Self {
        let lanes = vec![
            config.mid_x - config.move_step,
            config.mid_x,
            config.mid_x + config.move_step,
        ];
        let position = Vector3::new(config.mid_x, 0.0, 0.0);
        let lives = config.lives;

        let mut oracle = Self {
            config,
            lanes,
            rng: ChaCha8Rng::seed_from_u64(seed),
            position,
            target_lane: 1,
            vertical_velocity: 0.0,
            grounded: true,
            yaw: 0.0,
            next_allowed_move: 0.0,
            hazards: Vec::new(),
            lives,
            current_time: 0.0,
            history: VecDeque::new(),
        };
        oracle.push_history();
        oracle
    }

    /// Lane X coordinates (left to right).
    pub fn lanes(&self) -> &[f64] {
        &self.lanes
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_game_over(&self) -> bool {
        self.lives == 0
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Lane nearest to the current X.
    pub fn current_lane(&self) -> usize {
        nearest_lane(&self.lanes, self.position.x).unwrap_or(1)
    }

    pub fn add_hazard(&mut self, hazard: Hazard) {
        self.hazards.push(hazard);
    }

    /// Requests a lane change (-1 left, +1 right). Ignored during cooldown.
    pub fn move_to_lane(&mut self, direction: i32) -> bool {
        if self.current_time < self.next_allowed_move || self.is_game_over() {
            return false;
        }
        let max_lane = self.lanes.len() as i32 - 1;
        let new_lane = (self.target_lane as i32 + direction).clamp(0, max_lane) as usize;
        self.next_allowed_move = self.current_time + self.config.move_cooldown;
        let changed = new_lane != self.target_lane;
        self.target_lane = new_lane;
        changed
    }

    /// Starts a jump if on the ground.
    pub fn jump(&mut self) -> bool {
        if !self.grounded || self.is_game_over() {
            return false;
        }
        self.vertical_velocity = self.config.jump_force;
        self.grounded = false;
        true
    }

    /// Random lane change in either direction.
    pub fn random_lane_change(&mut self) -> bool {
        let direction = if self.rng.gen_bool(0.5) { 1 } else { -1 };
        // At an edge lane, bounce back inwards
        let direction = match (self.target_lane, direction) {
            (0, -1) => 1,
            (lane, 1) if lane + 1 == self.lanes.len() => -1,
            _ => direction,
        };
        self.move_to_lane(direction)
    }

    /// Returns true with the given probability, from the runner's RNG.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Advances physics by `dt` seconds and returns hazards hit.
    pub fn step(&mut self, dt: f64) -> Vec<Collision> {
        self.current_time += dt;
        let mut collisions = Vec::new();

        if !self.is_game_over() {
            let prev_z = self.position.z;
            self.advance_lateral(dt);
            self.advance_vertical(dt);
            self.position.z += self.config.base_speed * dt;

            let lane = self.current_lane();
            let (pos, time) = (self.position, self.current_time);
            let mut hit = Vec::new();
            self.hazards.retain(|h| {
                let crossed = h.z > prev_z && h.z <= pos.z;
                let blocked = h.lane == lane && pos.y < h.height;
                if crossed && blocked {
                    hit.push(*h);
                    false
                } else {
                    true
                }
            });

            for hazard in hit {
                self.lives = self.lives.saturating_sub(1);
                collisions.push(Collision {
                    time,
                    pose: self.pose(),
                    hazard,
                    lives_left: self.lives,
                });
                if self.is_game_over() {
                    break;
                }
            }
        }

        self.push_history();
        collisions
    }

    /// Ground truth at `time`, linearly interpolated between history frames.
    ///
    /// `None` outside the retained history (the last `history_secs`).
    pub fn truth_at(&self, time: f64) -> Option<TruthFrame> {
        let first = self.history.front()?;
        let last = self.history.back()?;
        if time < first.time || time > last.time {
            return None;
        }

        let idx = self.history.partition_point(|f| f.time <= time);
        if idx == 0 {
            return Some(*first);
        }
        let a = &self.history[idx - 1];
        let Some(b) = self.history.get(idx) else {
            return Some(*a);
        };

        let t = ghostsync_core::sync_state::inverse_lerp(a.time, b.time, time);
        Some(TruthFrame {
            time,
            pose: Pose::interpolate(&a.pose, &b.pose, t),
            grounded: a.grounded || b.grounded,
        })
    }

    /// Lane index of a truth frame.
    pub fn lane_of(&self, frame: &TruthFrame) -> usize {
        nearest_lane(&self.lanes, frame.pose.position.x).unwrap_or(1)
    }

    fn advance_lateral(&mut self, dt: f64) {
        let target_x = self.lanes[self.target_lane];
        let dx = target_x - self.position.x;
        let max_step = self.config.move_speed * dt;
        if dx.abs() <= max_step {
            self.position.x = target_x;
            self.yaw = 0.0;
        } else {
            self.position.x += max_step * dx.signum();
            self.yaw = 0.2 * dx.signum();
        }
    }

    fn advance_vertical(&mut self, dt: f64) {
        if self.grounded {
            return;
        }
        self.vertical_velocity += self.config.gravity * dt;
        self.position.y += self.vertical_velocity * dt;

        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.vertical_velocity = 0.0;
            self.grounded = true;
        }
    }

    fn push_history(&mut self) {
        self.history.push_back(TruthFrame {
            time: self.current_time,
            pose: self.pose(),
            grounded: self.grounded,
        });

        // Keep one frame at or before the cutoff so it can still be bracketed
        let cutoff = self.current_time - self.config.history_secs.max(0.0);
        while self.history.get(1).is_some_and(|f| f.time <= cutoff) {
            self.history.pop_front();
        }
    }
}

impl PoseSource for RunnerOracle {
    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        let roll = self.position.z / self.config.roll_radius;
        UnitQuaternion::from_euler_angles(roll, self.yaw, 0.0)
    }
}
