use std::fmt::Debug;

/// Index of a frame inside the buffer pool.
pub type FrameId = usize;

/// Eviction policy over frames with a zero pin count.
///
/// The buffer pool tells the replacer when a frame becomes evictable
/// (`unpin`) and when it stops being evictable (`pin`); the replacer must
/// never return a frame it was not told about.
pub trait Replacer: Send + Sync + Debug {
    /// Select a frame to evict. Returns None if no frame can be evicted.
    fn evict(&mut self) -> Option<FrameId>;

    /// Mark a frame as pinned (not evictable).
    fn pin(&mut self, frame_id: FrameId);

    /// Mark a frame as unpinned (evictable).
    fn unpin(&mut self, frame_id: FrameId);

    /// Get the number of evictable frames.
    fn size(&self) -> usize;
}
