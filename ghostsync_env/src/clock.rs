//! Core clock trait for GhostSync adapters.

use std::time::Duration;

/// The central interface for reading time.
///
/// # Implementations
///
/// - **Production**: `SystemClock` - wraps `std::time::Instant`
/// - **Simulation**: `SimClock` (in `ghostsync_sim`) - virtual nanoseconds
///   advanced manually by the harness
pub trait SyncClock: Send + Sync + 'static {
    /// Returns the current monotonic time since clock creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns [`now`](Self::now) as seconds.
    ///
    /// Sample timestamps and query times in `ghostsync_core` are in this unit.
    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
}
