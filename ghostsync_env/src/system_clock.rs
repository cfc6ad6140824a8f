//! Production implementation of SyncClock using the monotonic OS clock.

use crate::SyncClock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production clock backed by `Instant`.
///
/// Time zero is the moment the clock was created.
pub struct SystemClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemClock {
    /// Creates a new SystemClock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped clock for sharing between adapters.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncClock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(5));
    }

    #[test]
    fn test_system_clock_secs_matches_duration() {
        let clock = SystemClock::new();
        let secs = clock.now_secs();
        assert!(secs >= 0.0);
        assert!(secs < 1.0, "fresh clock should start near zero");
    }
}
