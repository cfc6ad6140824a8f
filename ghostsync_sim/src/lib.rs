//! GhostSync Deterministic Simulation Harness
//!
//! Runs a lane runner and its delayed ghost side by side on a virtual
//! clock, so every playback property can be checked against ground truth.
//!
//! # Core Principle: One Clock, One Seed
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: [`SimClock`] only moves when the harness advances it
//! - **Input**: lane changes and jumps come from a seeded ChaCha stream
//! - **Frame pacing**: jitter is drawn from a second stream of the same seed
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ ScenarioRunner                                             │
//! │                                                            │
//! │   SimClock (virtual time shared by every adapter)          │
//! │                                                            │
//! │   RunnerOracle ──record──► DelayedStateReader              │
//! │    │  └──collisions──────►       │ query                   │
//! │    │                             ▼                         │
//! │    └──truth_at(t - lag)───► GhostFollower                  │
//! │           compare                                          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ghostsync_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_duration(10.0)
//!     .run(ScenarioId::Crash)?;
//! assert!(result.passed);
//! ```

mod clock;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;

pub use clock::SimClock;
pub use error::SimError;
pub use exporter::{GhostFrame, SimEvent, SimExport, SimFrame, TruthPosition};
pub use oracle::{Collision, Hazard, RunnerConfig, RunnerOracle, TruthFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::{ScenarioId, ScenarioPlan};
