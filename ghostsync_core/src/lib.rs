//! GhostSync Core - Delayed, interpolated playback of a pose stream
//!
//! A producer records timestamped poses into a fixed-capacity ring buffer;
//! a consumer reads them back `simulated_lag` seconds in the past, blended
//! between the two samples that bracket the lagged time:
//! 1. **State model**: continuous [`Pose`] vs. categorical lane/flags
//! 2. **Ring buffer**: bounded backward bracket search with graceful degradation
//! 3. **Delayed reader**: lag policy, flag OR-ing, terminal-event injection

pub mod adapters;
pub mod config;
pub mod error;
pub mod sync_buffer;
pub mod sync_reader;
pub mod sync_state;

// Re-export key types for convenience
pub use adapters::{GhostFollower, GhostView, PoseSampler, PoseSource, TerminalEventReporter};
pub use config::{ConsumerConfig, GhostSyncConfig, ProducerConfig, ReaderConfig, TerminalLanePolicy};
pub use error::SyncError;
pub use sync_buffer::{Bracket, BracketKind, SyncBuffer};
pub use sync_reader::{DelayedStateReader, QueryStats, SharedReader};
pub use sync_state::{Pose, StateSample};
