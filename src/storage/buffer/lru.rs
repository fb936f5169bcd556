//! Least-recently-released replacement policy.
//!
//! Each release stamps the frame with a monotonically increasing tick; the
//! victim is the evictable frame with the smallest tick.

use super::replacer::{FrameId, Replacer};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct LruReplacer {
    /// Evictable frames ordered by release tick.
    by_tick: BTreeMap<u64, FrameId>,
    /// Release tick of each evictable frame, indexed by frame id.
    ticks: Vec<Option<u64>>,
    next_tick: u64,
}

impl LruReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            by_tick: BTreeMap::new(),
            ticks: vec![None; num_frames],
            next_tick: 0,
        }
    }
}

impl Replacer for LruReplacer {
    fn evict(&mut self) -> Option<FrameId> {
        let (_, frame_id) = self.by_tick.pop_first()?;
        self.ticks[frame_id] = None;
        Some(frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        if let Some(tick) = self.ticks.get_mut(frame_id).and_then(Option::take) {
            self.by_tick.remove(&tick);
        }
    }

    fn unpin(&mut self, frame_id: FrameId) {
        if let Some(slot) = self.ticks.get_mut(frame_id) {
            // Already evictable frames keep their original tick
            if slot.is_none() {
                *slot = Some(self.next_tick);
                self.by_tick.insert(self.next_tick, frame_id);
                self.next_tick += 1;
            }
        }
    }

    fn size(&self) -> usize {
        self.by_tick.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_order() {
        let mut replacer = LruReplacer::new(4);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);

        replacer.unpin(2);
        replacer.unpin(0);
        replacer.unpin(3);
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(0));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_pin_removes_candidate() {
        let mut replacer = LruReplacer::new(3);
        replacer.unpin(0);
        replacer.unpin(1);

        replacer.pin(0);
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), None);

        // Pinning something that is not evictable is a no-op
        replacer.pin(2);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_release_again_moves_to_back() {
        let mut replacer = LruReplacer::new(4);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);

        replacer.pin(1);
        replacer.unpin(1);
        replacer.unpin(0);

        assert_eq!(replacer.evict(), Some(2));
        assert_eq!(replacer.evict(), Some(3));
        assert_eq!(replacer.evict(), Some(1));
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_repeated_release_keeps_tick() {
        let mut replacer = LruReplacer::new(2);
        replacer.unpin(0);
        replacer.unpin(1);
        replacer.unpin(0);
        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.evict(), Some(0));
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut replacer = LruReplacer::new(2);
        replacer.unpin(7);
        replacer.pin(7);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }
}
