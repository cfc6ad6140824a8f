//! GhostSync Environment Abstraction Layer
//!
//! This crate provides the clock abstraction allowing the GhostSync core
//! to run against both **Production** (wall clock) and **Simulation**
//! (virtual clock) time sources.
//!
//! # Core Concept
//!
//! Every adapter in `ghostsync_core` reads time through a [`SyncClock`]
//! handed to it at construction. Nothing calls a global clock, so a
//! simulation harness can step time frame by frame and replay a run exactly.
//!
//! # Example
//!
//! ```ignore
//! use ghostsync_env::{SyncClock, SystemClock};
//!
//! let clock = SystemClock::shared();
//! let now = clock.now_secs();
//! ```

mod clock;
mod system_clock;

pub use clock::SyncClock;
pub use system_clock::SystemClock;
