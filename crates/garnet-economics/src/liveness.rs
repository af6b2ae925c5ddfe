// crates/garnet-economics/src/liveness.rs
//
// Rolling-window liveness tracking for a single validator.
//
// Only missed heights are stored. The window covers the most recent
// `block_signing_window` heights up to the newest height observed; misses
// that fall out of the window are forgotten.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use garnet_core::BlockHeight;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessTracker {
    missed: BTreeSet<BlockHeight>,
    newest: BlockHeight,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a missed vote at `height` and return the missed count inside
    /// the window.
    pub fn record_missed(&mut self, height: BlockHeight, window: u64) -> u64 {
        self.observe(height, window);
        if height.saturating_add(window) > self.newest {
            self.missed.insert(height);
        }
        self.missed_count()
    }

    /// Record a signed vote at `height`.
    pub fn record_signed(&mut self, height: BlockHeight, window: u64) {
        self.observe(height, window);
        self.missed.remove(&height);
    }

    pub fn missed_count(&self) -> u64 {
        self.missed.len() as u64
    }

    /// Forget all misses, e.g. after the validator was punished.
    pub fn reset(&mut self) {
        self.missed.clear();
    }

    fn observe(&mut self, height: BlockHeight, window: u64) {
        if height > self.newest {
            self.newest = height;
        }
        // window covers (newest - window, newest]
        let floor = (self.newest + 1).saturating_sub(window);
        self.missed = self.missed.split_off(&floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_misses_in_window() {
        let mut tracker = LivenessTracker::new();
        assert_eq!(tracker.record_missed(1, 5), 1);
        assert_eq!(tracker.record_missed(2, 5), 2);
        assert_eq!(tracker.record_missed(3, 5), 3);
    }

    #[test]
    fn test_old_misses_fall_out_of_window() {
        let mut tracker = LivenessTracker::new();
        tracker.record_missed(1, 3);
        tracker.record_missed(2, 3);
        tracker.record_signed(4, 3);
        // window is now {2, 3, 4}
        assert_eq!(tracker.missed_count(), 1);
        tracker.record_signed(5, 3);
        assert_eq!(tracker.missed_count(), 0);
    }

    #[test]
    fn test_duplicate_height_counted_once() {
        let mut tracker = LivenessTracker::new();
        tracker.record_missed(7, 10);
        assert_eq!(tracker.record_missed(7, 10), 1);
    }

    #[test]
    fn test_stale_miss_ignored() {
        let mut tracker = LivenessTracker::new();
        tracker.record_signed(100, 10);
        assert_eq!(tracker.record_missed(50, 10), 0);
    }

    #[test]
    fn test_signed_clears_misreported_miss() {
        let mut tracker = LivenessTracker::new();
        tracker.record_missed(3, 10);
        tracker.record_signed(3, 10);
        assert_eq!(tracker.missed_count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut tracker = LivenessTracker::new();
        tracker.record_missed(1, 10);
        tracker.record_missed(2, 10);
        tracker.reset();
        assert_eq!(tracker.missed_count(), 0);
    }
}
