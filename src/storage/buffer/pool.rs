//! Frame table: which page each frame holds, who pins it, whether it is dirty.

use super::replacer::{FrameId, Replacer};
use crate::storage::disk::{DiskManager, PAGE_SIZE};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use log::{debug, trace, warn};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub type PageBuf = Box<[u8; PAGE_SIZE]>;

pub(crate) struct Frame {
    data: Arc<RwLock<PageBuf>>,
    page_id: PageId,
    pin_count: u32,
    is_dirty: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Box::new([0u8; PAGE_SIZE]))),
            page_id: PageId::INVALID,
            pin_count: 0,
            is_dirty: false,
        }
    }

    /// Write the frame back if it is dirty. Never waits on the page latch:
    /// returns `Ok(false)` while a writer holds it.
    fn try_flush(&mut self, disk: &mut DiskManager) -> StorageResult<bool> {
        if !self.page_id.is_valid() || !self.is_dirty {
            return Ok(true);
        }
        let Some(data) = self.data.try_read() else {
            return Ok(false);
        };
        disk.write_page(self.page_id, &data[..])?;
        self.is_dirty = false;
        Ok(true)
    }
}

pub struct BufferPool {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: Box<dyn Replacer>,
}

impl BufferPool {
    pub fn new(num_frames: usize, replacer: Box<dyn Replacer>) -> Self {
        Self {
            frames: (0..num_frames).map(|_| Frame::new()).collect(),
            page_table: HashMap::with_capacity(num_frames),
            free_list: (0..num_frames).collect(),
            replacer,
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn resident_pages(&self) -> usize {
        self.page_table.len()
    }

    pub fn frame_of(&self, page_id: PageId) -> Option<FrameId> {
        self.page_table.get(&page_id).copied()
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.frame_of(page_id)
            .map(|frame_id| self.frames[frame_id].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        self.frame_of(page_id)
            .map(|frame_id| self.frames[frame_id].is_dirty)
    }

    /// Take one more reference on a resident page and hand out its buffer.
    pub(crate) fn pin(&mut self, frame_id: FrameId) -> Arc<RwLock<PageBuf>> {
        let frame = &mut self.frames[frame_id];
        frame.pin_count += 1;
        self.replacer.pin(frame_id);
        Arc::clone(&frame.data)
    }

    /// Drop one reference. Returns the remaining pin count.
    pub fn unpin(&mut self, page_id: PageId) -> StorageResult<u32> {
        let frame_id = self
            .frame_of(page_id)
            .ok_or(StorageError::PageNotResident(page_id))?;
        let frame = &mut self.frames[frame_id];
        if frame.pin_count == 0 {
            warn!("unpin of page {} which has no outstanding pins", page_id);
            return Err(StorageError::PageNotPinned(page_id));
        }

        frame.pin_count -= 1;
        if frame.pin_count == 0 {
            self.replacer.unpin(frame_id);
        }
        Ok(frame.pin_count)
    }

    /// The frame holding `page_id`, provided it still holds it in `data`.
    /// A handle whose page was evicted (and maybe loaded again elsewhere)
    /// no longer matches.
    pub(crate) fn frame_holding(
        &self,
        page_id: PageId,
        data: &Arc<RwLock<PageBuf>>,
    ) -> StorageResult<FrameId> {
        self.frame_of(page_id)
            .filter(|&frame_id| Arc::ptr_eq(&self.frames[frame_id].data, data))
            .ok_or(StorageError::PageNotResident(page_id))
    }

    pub(crate) fn set_dirty(
        &mut self,
        page_id: PageId,
        data: &Arc<RwLock<PageBuf>>,
        dirty: bool,
    ) -> StorageResult<()> {
        let frame_id = self.frame_holding(page_id, data)?;
        self.frames[frame_id].is_dirty = dirty;
        Ok(())
    }

    /// Find a frame for a new mapping: a free one if any, otherwise an
    /// unpinned victim, flushed first when dirty. Victims whose latch is
    /// held are passed over. A failed flush leaves the victim mapped and
    /// evictable.
    pub fn take_frame(&mut self, disk: &mut DiskManager) -> StorageResult<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        let mut latched = Vec::new();
        let result = loop {
            let Some(frame_id) = self.replacer.evict() else {
                break Err(StorageError::PoolExhausted);
            };
            let frame = &mut self.frames[frame_id];
            debug_assert_eq!(frame.pin_count, 0);

            let victim = frame.page_id;
            match frame.try_flush(disk) {
                Ok(true) => {
                    debug!("evicted page {} from frame {}", victim, frame_id);
                    self.page_table.remove(&victim);
                    frame.page_id = PageId::INVALID;
                    break Ok(frame_id);
                }
                Ok(false) => {
                    trace!("page {} is latched, trying another victim", victim);
                    latched.push(frame_id);
                }
                Err(e) => {
                    warn!("failed to flush page {} during eviction: {}", victim, e);
                    self.replacer.unpin(frame_id);
                    break Err(e);
                }
            }
        };

        for frame_id in latched {
            self.replacer.unpin(frame_id);
        }
        result
    }

    /// Return a frame obtained from `take_frame` that ended up unused.
    pub fn release_frame(&mut self, frame_id: FrameId) {
        self.free_list.push_back(frame_id);
    }

    /// Map `page_id` to `frame_id` with `buf` as its contents and a single pin.
    ///
    /// The frame gets a new buffer so that handles left over from the
    /// previous occupant never alias the new page.
    pub(crate) fn install(
        &mut self,
        frame_id: FrameId,
        page_id: PageId,
        buf: PageBuf,
        dirty: bool,
    ) -> Arc<RwLock<PageBuf>> {
        let frame = &mut self.frames[frame_id];
        frame.data = Arc::new(RwLock::new(buf));
        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.is_dirty = dirty;

        self.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Arc::clone(&frame.data)
    }

    /// Buffer of a resident page.
    pub(crate) fn buffer_of(&self, page_id: PageId) -> StorageResult<Arc<RwLock<PageBuf>>> {
        let frame_id = self
            .frame_of(page_id)
            .ok_or(StorageError::PageNotResident(page_id))?;
        Ok(Arc::clone(&self.frames[frame_id].data))
    }

    /// Pages currently dirty, with their buffers, so they can be written
    /// back without holding the pool lock while waiting on page latches.
    pub(crate) fn dirty_pages(&self) -> Vec<(PageId, Arc<RwLock<PageBuf>>)> {
        self.frames
            .iter()
            .filter(|frame| frame.page_id.is_valid() && frame.is_dirty)
            .map(|frame| (frame.page_id, Arc::clone(&frame.data)))
            .collect()
    }

    /// Write `bytes`, read from `data` under its latch, as the contents of
    /// `page_id` and mark the page clean. Does nothing when the page left the
    /// pool in the meantime (eviction flushed it) or is already clean.
    pub(crate) fn write_back(
        &mut self,
        page_id: PageId,
        data: &Arc<RwLock<PageBuf>>,
        bytes: &[u8],
        disk: &mut DiskManager,
    ) -> StorageResult<()> {
        let Ok(frame_id) = self.frame_holding(page_id, data) else {
            return Ok(());
        };
        let frame = &mut self.frames[frame_id];
        if frame.is_dirty {
            disk.write_page(page_id, bytes)?;
            frame.is_dirty = false;
        }
        Ok(())
    }

    /// Flush every dirty frame that no writer is holding. Latched frames are
    /// skipped with a warning.
    pub fn flush_unlatched(&mut self, disk: &mut DiskManager) -> StorageResult<()> {
        for frame in &mut self.frames {
            if !frame.try_flush(disk)? {
                warn!("page {} is latched, left unflushed", frame.page_id);
            }
        }
        Ok(())
    }
}
