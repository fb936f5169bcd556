//! Slot directory embedded in leaf and branch pages.
//!
//! ```text
//! [base:base+2)    slot count (u16 LE)
//! [base+2:base+4)  free space (u16 LE)
//! [base+4:4096)    record region
//! ```
//!
//! Records are not laid out here yet; the directory only tracks its counters.

use crate::storage::page::utils::{read_u16, write_u16};

pub const SLOT_HEADER_SIZE: usize = 4;

const NUM_SLOTS_OFFSET: usize = 0;
const FREE_SPACE_OFFSET: usize = 2;

/// View over a page's slot directory starting at `base`.
pub struct SlotDirectory<B> {
    data: B,
    base: usize,
}

impl<B: AsRef<[u8]>> SlotDirectory<B> {
    pub(crate) fn new(data: B, base: usize) -> Self {
        Self { data, base }
    }

    pub fn num_slots(&self) -> u16 {
        read_u16(self.data.as_ref(), self.base + NUM_SLOTS_OFFSET)
    }

    pub fn free_space(&self) -> u16 {
        read_u16(self.data.as_ref(), self.base + FREE_SPACE_OFFSET)
    }

    pub fn body(&self) -> &[u8] {
        &self.data.as_ref()[self.base + SLOT_HEADER_SIZE..]
    }

    /// Size of the record region.
    pub fn capacity(&self) -> usize {
        self.body().len()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlotDirectory<B> {
    pub fn set_num_slots(&mut self, num_slots: u16) {
        write_u16(self.data.as_mut(), self.base + NUM_SLOTS_OFFSET, num_slots);
    }

    pub fn set_free_space(&mut self, free_space: u16) {
        write_u16(self.data.as_mut(), self.base + FREE_SPACE_OFFSET, free_space);
    }

    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[self.base + SLOT_HEADER_SIZE..]
    }

    /// No slots, the whole record region free.
    pub fn reset(&mut self) {
        let capacity = self.capacity() as u16;
        self.set_num_slots(0);
        self.set_free_space(capacity);
    }
}
