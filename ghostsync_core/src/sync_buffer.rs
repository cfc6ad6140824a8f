//! The ring buffer - fixed-capacity, time-indexed sample store.
//!
//! A single producer appends samples; the reader asks for the pair of
//! retained samples that bracket an arbitrary query time. Slots are
//! allocated once and overwritten in place forever.
//!
//! The bracket search never fails once anything has been written: times in
//! the future clamp to the newest sample, times older than the retained
//! window fall back to the newest sample, and a lower bracket without a valid
//! forward neighbour collapses to an exact hit.

use crate::sync_state::{inverse_lerp, StateSample};

/// Smallest capacity the buffer will accept.
pub const MIN_CAPACITY: usize = 8;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

/// How a bracket was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    /// Two distinct samples straddle the query time
    Interpolated,

    /// Query time is at or past the newest sample
    Clamped,

    /// Lower bracket found but no valid forward neighbour (t = 0)
    Degenerate,

    /// Query time is older than everything retained; newest sample returned
    Stale,
}

/// The two samples around a query time plus the blend factor between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Sample at or before the query time
    pub lower: StateSample,

    /// Sample after the query time (equal to `lower` for exact hits)
    pub upper: StateSample,

    /// Interpolation parameter in `[0, 1]`
    pub t: f64,

    /// How the bracket was resolved
    pub kind: BracketKind,
}

impl Bracket {
    fn exact(sample: StateSample, kind: BracketKind) -> Self {
        Self {
            lower: sample,
            upper: sample,
            t: 0.0,
            kind,
        }
    }
}

/// Fixed-capacity circular store of [`StateSample`]s.
#[derive(Debug, Clone)]
pub struct SyncBuffer {
    /// Sample slots; `None` means never written
    slots: Vec<Option<StateSample>>,

    /// Index the next push writes to
    cursor: usize,
}

impl SyncBuffer {
    /// Creates a buffer with `max(capacity, MIN_CAPACITY)` slots.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            slots: vec![None; capacity],
            cursor: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True until the first push.
    pub fn is_empty(&self) -> bool {
        self.newest().is_none()
    }

    /// Writes `sample` at the cursor and advances it, overwriting the
    /// oldest entry once the buffer has wrapped.
    pub fn push(&mut self, sample: StateSample) {
        self.slots[self.cursor] = Some(sample);
        self.cursor = (self.cursor + 1) % self.capacity();
    }

    /// The most recently pushed sample.
    pub fn newest(&self) -> Option<&StateSample> {
        self.slots[self.newest_index()].as_ref()
    }

    /// Retained samples in push order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StateSample> + '_ {
        let cap = self.capacity();
        let start = self.cursor;
        (0..cap).filter_map(move |i| self.slots[(start + i) % cap].as_ref())
    }

    /// Forgets every sample and rewinds the cursor.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.cursor = 0;
    }

    /// Finds the samples bracketing `target_time`.
    ///
    /// Returns `None` only when nothing has ever been pushed. The backward
    /// scan is bounded by the capacity and does not allocate.
    pub fn find_bracket(&self, target_time: f64) -> Option<Bracket> {
        let cap = self.capacity();
        let newest_idx = self.newest_index();
        let newest = self.slots[newest_idx]?;

        if target_time >= newest.timestamp {
            return Some(Bracket::exact(newest, BracketKind::Clamped));
        }

        let mut idx = newest_idx;
        for _ in 0..cap {
            if let Some(cur) = self.slots[idx] {
                if cur.timestamp <= target_time {
                    let forward = self.slots[(idx + 1) % cap];
                    return Some(match forward {
                        Some(next) if next.timestamp > cur.timestamp => Bracket {
                            lower: cur,
                            upper: next,
                            t: inverse_lerp(cur.timestamp, next.timestamp, target_time),
                            kind: BracketKind::Interpolated,
                        },
                        _ => Bracket::exact(cur, BracketKind::Degenerate),
                    });
                }
            }
            idx = (idx + cap - 1) % cap;
        }

        Some(Bracket::exact(newest, BracketKind::Stale))
    }

    fn newest_index(&self) -> usize {
        let cap = self.capacity();
        (self.cursor + cap - 1) % cap
    }
}

impl Default for SyncBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_state::Pose;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use proptest::prelude::*;

    fn sample(t: f64, x: f64) -> StateSample {
        StateSample::new(t, Pose::at(Vector3::new(x, 0.0, 0.0)), 0)
    }

    #[test]
    fn test_capacity_floor() {
        assert_eq!(SyncBuffer::new(0).capacity(), MIN_CAPACITY);
        assert_eq!(SyncBuffer::new(3).capacity(), MIN_CAPACITY);
        assert_eq!(SyncBuffer::new(8).capacity(), 8);
        assert_eq!(SyncBuffer::new(100).capacity(), 100);
    }

    #[test]
    fn test_empty_buffer_has_no_bracket() {
        let buffer = SyncBuffer::new(16);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert!(buffer.find_bracket(1.0).is_none());
    }

    #[test]
    fn test_overwrite_keeps_most_recent() {
        let mut buffer = SyncBuffer::new(8);
        let k = 5;
        for i in 0..(8 + k) {
            buffer.push(sample(i as f64 + 1.0, i as f64));
        }

        let retained: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
        let expected: Vec<f64> = (k..(8 + k)).map(|i| i as f64 + 1.0).collect();
        assert_eq!(retained, expected);
        assert_eq!(buffer.len(), 8);

        // The overwritten samples are gone from the search too
        let bracket = buffer.find_bracket(2.0).unwrap();
        assert_eq!(bracket.kind, BracketKind::Stale);
        assert_relative_eq!(bracket.lower.timestamp, 13.0);
    }

    #[test]
    fn test_future_query_clamps_to_newest() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(1.0, 0.0));
        buffer.push(sample(2.0, 10.0));

        let bracket = buffer.find_bracket(5.0).unwrap();
        assert_eq!(bracket.kind, BracketKind::Clamped);
        assert_relative_eq!(bracket.t, 0.0);
        assert_relative_eq!(bracket.lower.timestamp, 2.0);
        assert_relative_eq!(bracket.upper.timestamp, 2.0);
    }

    #[test]
    fn test_bracket_interpolates_between_neighbours() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(0.0, 0.0));
        buffer.push(sample(1.0, 10.0));
        buffer.push(sample(2.0, 20.0));

        let b = buffer.find_bracket(0.5).unwrap();
        assert_eq!(b.kind, BracketKind::Interpolated);
        assert_relative_eq!(b.lower.timestamp, 0.0);
        assert_relative_eq!(b.upper.timestamp, 1.0);
        assert_relative_eq!(b.t, 0.5);

        let b = buffer.find_bracket(1.5).unwrap();
        assert_relative_eq!(b.lower.timestamp, 1.0);
        assert_relative_eq!(b.upper.timestamp, 2.0);
        assert_relative_eq!(b.t, 0.5);
    }

    #[test]
    fn test_bracket_across_wraparound() {
        let mut buffer = SyncBuffer::new(8);
        for i in 0..11 {
            buffer.push(sample(i as f64, i as f64));
        }
        // Slot 7 holds t=7 and slot 0 holds t=8 after the wrap
        let b = buffer.find_bracket(7.25).unwrap();
        assert_eq!(b.kind, BracketKind::Interpolated);
        assert_relative_eq!(b.lower.timestamp, 7.0);
        assert_relative_eq!(b.upper.timestamp, 8.0);
        assert_relative_eq!(b.t, 0.25);
    }

    #[test]
    fn test_duplicate_timestamps_use_latest_write() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(1.0, 0.0));
        buffer.push(sample(2.0, 10.0));
        buffer.push(sample(2.0, 11.0));
        buffer.push(sample(3.0, 20.0));

        let b = buffer.find_bracket(2.5).unwrap();
        assert_eq!(b.kind, BracketKind::Interpolated);
        assert_relative_eq!(b.lower.pose.position.x, 11.0);
        assert_relative_eq!(b.upper.timestamp, 3.0);
        assert_relative_eq!(b.t, 0.5);

        // Exactly on the duplicate: t = 0 on the later copy
        let b = buffer.find_bracket(2.0).unwrap();
        assert_relative_eq!(b.t, 0.0);
        assert_relative_eq!(b.lower.pose.position.x, 11.0);
    }

    #[test]
    fn test_out_of_order_sample_keeps_valid_interval() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(1.0, 0.0));
        buffer.push(sample(3.0, 30.0));
        buffer.push(sample(2.0, 20.0));
        buffer.push(sample(4.0, 40.0));

        // Backward scan meets t=2.0 first; its forward slot holds t=4.0
        let b = buffer.find_bracket(3.5).unwrap();
        assert_eq!(b.kind, BracketKind::Interpolated);
        assert_relative_eq!(b.lower.timestamp, 2.0);
        assert_relative_eq!(b.upper.timestamp, 4.0);
        assert_relative_eq!(b.t, 0.75);

        let b = buffer.find_bracket(1.5).unwrap();
        assert_relative_eq!(b.lower.timestamp, 1.0);
        assert_relative_eq!(b.upper.timestamp, 3.0);
        assert_relative_eq!(b.t, 0.25);
    }

    #[test]
    fn test_invalid_forward_slot_is_degenerate() {
        let mut buffer = SyncBuffer::new(8);
        buffer.slots[0] = Some(sample(1.0, 10.0));
        buffer.slots[2] = Some(sample(3.0, 30.0));
        buffer.cursor = 3;

        // Forward neighbour of t=1.0 is an empty slot
        let b = buffer.find_bracket(2.0).unwrap();
        assert_eq!(b.kind, BracketKind::Degenerate);
        assert_relative_eq!(b.lower.timestamp, 1.0);
        assert_eq!(b.lower, b.upper);
        assert_relative_eq!(b.t, 0.0);
    }

    #[test]
    fn test_target_before_window_is_stale() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(5.0, 50.0));
        buffer.push(sample(6.0, 60.0));

        let b = buffer.find_bracket(1.0).unwrap();
        assert_eq!(b.kind, BracketKind::Stale);
        assert_relative_eq!(b.lower.timestamp, 6.0);
        assert_relative_eq!(b.t, 0.0);
    }

    #[test]
    fn test_clear_resets_buffer() {
        let mut buffer = SyncBuffer::new(8);
        buffer.push(sample(1.0, 0.0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.find_bracket(1.0).is_none());
    }

    proptest! {
        #[test]
        fn prop_future_query_returns_newest(
            times in prop::collection::vec(0.0f64..1000.0, 1..40),
            ahead in 0.0f64..100.0,
        ) {
            let mut buffer = SyncBuffer::new(16);
            for (i, t) in times.iter().enumerate() {
                buffer.push(sample(*t, i as f64));
            }
            let newest = *buffer.newest().unwrap();
            let b = buffer.find_bracket(newest.timestamp + ahead).unwrap();
            prop_assert_eq!(b.kind, BracketKind::Clamped);
            prop_assert_eq!(b.lower, newest);
            prop_assert_eq!(b.upper, newest);
            prop_assert_eq!(b.t, 0.0);
        }

        #[test]
        fn prop_bracket_t_in_unit_interval(
            times in prop::collection::vec(0.0f64..100.0, 1..40),
            target in -10.0f64..110.0,
        ) {
            let mut buffer = SyncBuffer::new(8);
            for (i, t) in times.iter().enumerate() {
                buffer.push(sample(*t, i as f64));
            }
            let b = buffer.find_bracket(target).unwrap();
            prop_assert!((0.0..=1.0).contains(&b.t));
            if b.kind == BracketKind::Interpolated {
                prop_assert!(b.lower.timestamp <= target);
                prop_assert!(b.upper.timestamp > b.lower.timestamp);
            }
        }

        #[test]
        fn prop_retains_last_capacity_samples(extra in 1usize..50) {
            let mut buffer = SyncBuffer::new(8);
            let total = 8 + extra;
            for i in 0..total {
                buffer.push(sample(i as f64, i as f64));
            }
            let retained: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
            let expected: Vec<f64> = (extra..total).map(|i| i as f64).collect();
            prop_assert_eq!(retained, expected);
        }
    }
}
