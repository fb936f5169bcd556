//! Clock (second-chance) replacement policy.
//!
//! Every evictable frame carries a reference bit, set when the frame is
//! released. The hand sweeps the frames circularly: a set bit is cleared and
//! the frame skipped once, a clear bit makes the frame the victim.

use super::replacer::{FrameId, Replacer};

#[derive(Debug)]
pub struct ClockReplacer {
    /// `None` for frames that are pinned or unknown, otherwise the reference bit.
    slots: Vec<Option<bool>>,
    hand: usize,
    evictable: usize,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            slots: vec![None; num_frames],
            hand: 0,
            evictable: 0,
        }
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.slots.len();
    }
}

impl Replacer for ClockReplacer {
    fn evict(&mut self) -> Option<FrameId> {
        if self.evictable == 0 {
            return None;
        }

        // Two sweeps suffice: the first clears every reference bit it passes.
        for _ in 0..2 * self.slots.len() {
            let frame_id = self.hand;
            self.advance();
            match self.slots[frame_id] {
                Some(true) => self.slots[frame_id] = Some(false),
                Some(false) => {
                    self.slots[frame_id] = None;
                    self.evictable -= 1;
                    return Some(frame_id);
                }
                None => {}
            }
        }
        None
    }

    fn pin(&mut self, frame_id: FrameId) {
        if let Some(slot) = self.slots.get_mut(frame_id) {
            if slot.take().is_some() {
                self.evictable -= 1;
            }
        }
    }

    fn unpin(&mut self, frame_id: FrameId) {
        if let Some(slot) = self.slots.get_mut(frame_id) {
            if slot.is_none() {
                self.evictable += 1;
            }
            *slot = Some(true);
        }
    }

    fn size(&self) -> usize {
        self.evictable
    }
}
