//! Virtual clock implementing SyncClock for deterministic runs.

use ghostsync_env::SyncClock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Simulation clock that only moves when the harness advances it.
pub struct SimClock {
    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: AtomicU64,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: AtomicU64::new(0),
        }
    }

    /// Creates an Arc-wrapped clock for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances virtual time by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.virtual_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Sets the virtual time in seconds.
    pub fn set_secs(&self, secs: f64) {
        let ns = (secs.max(0.0) * 1e9).round() as u64;
        self.virtual_time_ns.store(ns, Ordering::SeqCst);
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns.load(Ordering::SeqCst)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncClock for SimClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_clock_time() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));

        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(1500));
        assert_eq!(clock.now_secs(), 1.5);
    }

    #[test]
    fn test_sim_clock_set() {
        let clock = SimClock::new();
        clock.set_secs(2.25);
        assert_eq!(clock.time_ns(), 2_250_000_000);

        clock.set_secs(-1.0);
        assert_eq!(clock.time_ns(), 0);
    }

    #[test]
    fn test_sim_clock_shared_sees_same_time() {
        let clock = SimClock::shared();
        let other = Arc::clone(&clock);

        clock.advance(Duration::from_secs(5));
        assert_eq!(other.now(), Duration::from_secs(5));
    }
}
