pub mod clock;
pub mod lru;
pub mod pool;
pub mod replacer;

use crate::storage::config::StorageConfig;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{DiskManager, PageId, PAGE_SIZE};
use log::{debug, trace, warn};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use pool::{BufferPool, PageBuf};
use replacer::Replacer;
use std::path::Path;
use std::sync::Arc;

pub type PageReadGuard<'a> = MappedRwLockReadGuard<'a, [u8; PAGE_SIZE]>;
pub type PageWriteGuard<'a> = MappedRwLockWriteGuard<'a, [u8; PAGE_SIZE]>;

/// The gateway to pages: every create, fetch, release and flush goes
/// through here. Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    state: Mutex<PoolState>,
}

struct PoolState {
    pool: BufferPool,
    /// `None` once the pool has been closed.
    disk: Option<DiskManager>,
}

impl PoolState {
    fn parts(&mut self) -> StorageResult<(&mut BufferPool, &mut DiskManager)> {
        let disk = self.disk.as_mut().ok_or(StorageError::Closed)?;
        Ok((&mut self.pool, disk))
    }
}

impl BufferPoolManager {
    pub fn new(disk: DiskManager, replacer: Box<dyn Replacer>, pool_size: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                state: Mutex::new(PoolState {
                    pool: BufferPool::new(pool_size, replacer),
                    disk: Some(disk),
                }),
            }),
        }
    }

    /// Open (or create) the heap file at `path` with the given configuration.
    pub fn open(path: &Path, config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let disk = DiskManager::open(path)?;
        debug!(
            "buffer pool with {} frames ({:?} replacer) over {:?}",
            config.pool_size, config.replacer, path
        );
        Ok(Self::new(
            disk,
            config.replacer.build(config.pool_size),
            config.pool_size,
        ))
    }

    /// Allocate a new zeroed page. The page starts dirty with one pin, which
    /// the caller owns and must release with [`unpin_page`](Self::unpin_page).
    pub fn create_page(&self) -> StorageResult<PageId> {
        let mut state = self.inner.state.lock();
        let (pool, disk) = state.parts()?;

        let frame_id = pool.take_frame(disk)?;
        let page_id = disk.allocate_page();
        pool.install(frame_id, page_id, Box::new([0u8; PAGE_SIZE]), true);
        debug!("created page {} in frame {}", page_id, frame_id);

        Ok(page_id)
    }

    /// Pin a page and return a handle over its cached buffer, reading it from
    /// disk on a miss.
    #[must_use = "a fetched page stays pinned until it is unpinned"]
    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle> {
        if !page_id.is_valid() {
            return Err(StorageError::InvalidPageId(page_id));
        }

        let mut state = self.inner.state.lock();
        let (pool, disk) = state.parts()?;

        // Check if page is already in buffer pool
        if let Some(frame_id) = pool.frame_of(page_id) {
            trace!("page {} hit in frame {}", page_id, frame_id);
            let data = pool.pin(frame_id);
            return Ok(self.handle(page_id, data));
        }

        // Page not in buffer pool, need to load from disk
        let frame_id = pool.take_frame(disk)?;
        let mut buf: PageBuf = Box::new([0u8; PAGE_SIZE]);
        if let Err(e) = disk.read_page(page_id, &mut buf[..]) {
            pool.release_frame(frame_id);
            return Err(e);
        }
        debug!("loaded page {} into frame {}", page_id, frame_id);

        let data = pool.install(frame_id, page_id, buf, false);
        Ok(self.handle(page_id, data))
    }

    /// Release one reference to a page without going through a handle.
    pub fn unpin_page(&self, page_id: PageId) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let (pool, _) = state.parts()?;
        pool.unpin(page_id).map(|_| ())
    }

    /// Current pin count of a resident page.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.inner.state.lock().pool.pin_count(page_id)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        self.inner.state.lock().pool.is_dirty(page_id)
    }

    pub fn capacity(&self) -> usize {
        self.inner.state.lock().pool.capacity()
    }

    pub fn resident_pages(&self) -> usize {
        self.inner.state.lock().pool.resident_pages()
    }

    /// Write a resident page to disk if it is dirty.
    ///
    /// Waits for any writer of the page to finish, so the calling thread
    /// must not hold a write guard on it.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        let data = {
            let mut state = self.inner.state.lock();
            let (pool, _) = state.parts()?;
            pool.buffer_of(page_id)?
        };
        self.write_back(page_id, &data)
    }

    /// Write every dirty page to disk.
    ///
    /// Waits for writers of dirty pages to finish, so the calling thread must
    /// not hold a write guard on any page.
    pub fn flush_all(&self) -> StorageResult<()> {
        let dirty = {
            let mut state = self.inner.state.lock();
            let (pool, _) = state.parts()?;
            pool.dirty_pages()
        };
        for (page_id, data) in &dirty {
            self.write_back(*page_id, data)?;
        }

        let mut state = self.inner.state.lock();
        let (_, disk) = state.parts()?;
        disk.sync()
    }

    /// Flush every dirty page, then sync and close the heap file. Every later
    /// operation fails with [`StorageError::Closed`].
    pub fn close(&self) -> StorageResult<()> {
        let flushed = match self.flush_all() {
            Err(StorageError::Closed) => return Err(StorageError::Closed),
            flushed => flushed,
        };

        let mut state = self.inner.state.lock();
        let disk = state.disk.take().ok_or(StorageError::Closed)?;
        let result = shutdown(&mut state.pool, disk);
        debug!("buffer pool closed");
        flushed.and(result)
    }

    // The page latch is always taken before the pool lock, and the pool lock
    // is never held while waiting on a latch.
    fn write_back(&self, page_id: PageId, data: &Arc<RwLock<PageBuf>>) -> StorageResult<()> {
        let bytes = data.read();
        let mut state = self.inner.state.lock();
        let (pool, disk) = state.parts()?;
        pool.write_back(page_id, data, &bytes[..], disk)
    }

    fn handle(&self, page_id: PageId, data: Arc<RwLock<PageBuf>>) -> PageHandle {
        PageHandle {
            inner: Arc::clone(&self.inner),
            page_id,
            data,
        }
    }
}

/// Flush and close, closing the file even when a flush fails.
fn shutdown(pool: &mut BufferPool, mut disk: DiskManager) -> StorageResult<()> {
    let flushed = pool.flush_unlatched(&mut disk);
    let closed = disk.close();
    flushed.and(closed)
}

impl Drop for BufferPoolInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(disk) = state.disk.take() {
            if let Err(e) = shutdown(&mut state.pool, disk) {
                warn!("failed to flush buffer pool on drop: {}", e);
            }
        }
    }
}

/// A pinned page.
///
/// Dropping the handle does not release the pin; call [`unpin`](Self::unpin)
/// (or [`BufferPoolManager::unpin_page`]) exactly once per fetch. Guards
/// returned by [`data`](Self::data) and [`data_mut`](Self::data_mut) borrow
/// the live frame buffer, so layouts built on them read and write the cached
/// page directly.
pub struct PageHandle {
    inner: Arc<BufferPoolInner>,
    page_id: PageId,
    data: Arc<RwLock<PageBuf>>,
}

impl PageHandle {
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> PageReadGuard<'_> {
        RwLockReadGuard::map(self.data.read(), |buf| &**buf)
    }

    /// Mutable access to the buffer. Marks the page dirty.
    ///
    /// Fails with [`StorageError::PageNotResident`] once the page has been
    /// evicted from under this handle.
    pub fn data_mut(&self) -> StorageResult<PageWriteGuard<'_>> {
        let guard = self.data.write();
        self.set_dirty(true)?;
        Ok(RwLockWriteGuard::map(guard, |buf| &mut **buf))
    }

    /// Overwrite the whole page. Marks the page dirty.
    pub fn set_data(&self, bytes: &[u8]) -> StorageResult<()> {
        if bytes.len() != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        self.data_mut()?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn set_dirty(&self, dirty: bool) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let (pool, _) = state.parts()?;
        pool.set_dirty(self.page_id, &self.data, dirty)
    }

    /// Pins on the page, or 0 once it has been evicted from under this handle.
    pub fn pin_count(&self) -> u32 {
        let state = self.inner.state.lock();
        match state.pool.frame_holding(self.page_id, &self.data) {
            Ok(_) => state.pool.pin_count(self.page_id).unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Release the pin this handle was fetched with.
    pub fn unpin(self) -> StorageResult<()> {
        let mut state = self.inner.state.lock();
        let (pool, _) = state.parts()?;
        pool.frame_holding(self.page_id, &self.data)?;
        pool.unpin(self.page_id).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{LeafPage, NodePage, NodeType};
    use anyhow::{anyhow, Result};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn create_test_buffer_pool(max_frames: usize) -> Result<(TempDir, BufferPoolManager)> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.db");
        let disk = DiskManager::create(&file_path)?;
        let replacer = Box::new(lru::LruReplacer::new(max_frames));
        Ok((dir, BufferPoolManager::new(disk, replacer, max_frames)))
    }

    #[test]
    fn test_new_page() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(10)?;

        let page_id = buffer_pool.create_page()?;
        assert_eq!(page_id, PageId(0));
        assert_eq!(buffer_pool.pin_count(page_id), Some(1));
        assert_eq!(buffer_pool.is_dirty(page_id), Some(true));

        let page = buffer_pool.fetch_page(page_id)?;
        assert!(page.data().iter().all(|&b| b == 0));
        assert_eq!(page.pin_count(), 2);

        page.unpin()?;
        buffer_pool.unpin_page(page_id)?;
        assert_eq!(buffer_pool.pin_count(page_id), Some(0));

        Ok(())
    }

    #[test]
    fn test_fetch_shares_buffer() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(10)?;
        let page_id = buffer_pool.create_page()?;

        let first = buffer_pool.fetch_page(page_id)?;
        let second = buffer_pool.fetch_page(page_id)?;
        assert_eq!(first.pin_count(), 3);
        assert_eq!(first.data().as_ptr(), second.data().as_ptr());

        first.data_mut()?[0] = 42;
        assert_eq!(second.data()[0], 42);

        first.unpin()?;
        assert_eq!(second.pin_count(), 2);
        second.unpin()?;
        assert_eq!(buffer_pool.pin_count(page_id), Some(1));

        Ok(())
    }

    #[test]
    fn test_set_data() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(2)?;
        let page_id = buffer_pool.create_page()?;
        buffer_pool.flush_page(page_id)?;
        assert_eq!(buffer_pool.is_dirty(page_id), Some(false));

        let page = buffer_pool.fetch_page(page_id)?;
        assert!(matches!(
            page.set_data(b"short"),
            Err(StorageError::InvalidBufferSize { actual: 5, .. })
        ));
        assert_eq!(buffer_pool.is_dirty(page_id), Some(false));

        page.set_data(&[7u8; PAGE_SIZE])?;
        assert_eq!(buffer_pool.is_dirty(page_id), Some(true));
        assert_eq!(page.data()[PAGE_SIZE - 1], 7);

        page.set_dirty(false)?;
        assert_eq!(buffer_pool.is_dirty(page_id), Some(false));

        Ok(())
    }

    #[test]
    fn test_eviction() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(2)?;

        // Create 3 pages (more than buffer pool capacity)
        let mut ids = Vec::new();
        for i in 0..3u8 {
            let page_id = buffer_pool.create_page()?;
            let page = buffer_pool.fetch_page(page_id)?;
            page.data_mut()?[0] = i + 1;
            page.unpin()?;
            buffer_pool.unpin_page(page_id)?;
            ids.push(page_id);
        }
        assert_eq!(ids, vec![PageId(0), PageId(1), PageId(2)]);
        assert_eq!(buffer_pool.resident_pages(), 2);
        assert_eq!(buffer_pool.pin_count(PageId(0)), None);

        // Page 0 was evicted, fetch it again
        for (i, page_id) in ids.into_iter().enumerate() {
            let page = buffer_pool.fetch_page(page_id)?;
            assert_eq!(page.data()[0], i as u8 + 1);
            page.unpin()?;
        }

        Ok(())
    }

    #[test]
    fn test_pool_exhausted() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(2)?;

        let first = buffer_pool.create_page()?;
        let _second = buffer_pool.create_page()?;
        assert!(matches!(
            buffer_pool.create_page(),
            Err(StorageError::PoolExhausted)
        ));

        // The failed attempt does not consume a page id
        buffer_pool.unpin_page(first)?;
        assert_eq!(buffer_pool.create_page()?, PageId(2));

        Ok(())
    }

    #[test]
    fn test_fetch_errors() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(1)?;

        assert!(matches!(
            buffer_pool.fetch_page(PageId::INVALID),
            Err(StorageError::InvalidPageId(_))
        ));

        // Never written, so the read comes up short
        assert!(matches!(
            buffer_pool.fetch_page(PageId(3)),
            Err(StorageError::Io(_))
        ));

        // The frame taken for the failed read is usable again
        let page_id = buffer_pool.create_page()?;
        assert_eq!(buffer_pool.pin_count(page_id), Some(1));

        Ok(())
    }

    #[test]
    fn test_over_unpin() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(1)?;
        let page_id = buffer_pool.create_page()?;

        buffer_pool.unpin_page(page_id)?;
        assert!(matches!(
            buffer_pool.unpin_page(page_id),
            Err(StorageError::PageNotPinned(_))
        ));
        assert_eq!(buffer_pool.pin_count(page_id), Some(0));

        Ok(())
    }

    #[test]
    fn test_close() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.db");

        let buffer_pool = BufferPoolManager::open(&file_path, &StorageConfig::default())?;
        let page_id = buffer_pool.create_page()?;
        let page = buffer_pool.fetch_page(page_id)?;
        page.set_data(&[0x11u8; PAGE_SIZE])?;

        buffer_pool.close()?;
        assert!(matches!(buffer_pool.create_page(), Err(StorageError::Closed)));
        assert!(matches!(
            buffer_pool.fetch_page(page_id),
            Err(StorageError::Closed)
        ));
        assert!(matches!(page.unpin(), Err(StorageError::Closed)));
        assert!(matches!(buffer_pool.close(), Err(StorageError::Closed)));

        let buffer_pool = BufferPoolManager::open(&file_path, &StorageConfig::default())?;
        let page = buffer_pool.fetch_page(page_id)?;
        assert!(page.data().iter().all(|&b| b == 0x11));

        Ok(())
    }

    #[test]
    fn test_drop_flushes() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test.db");

        {
            let buffer_pool = BufferPoolManager::open(&file_path, &StorageConfig::default())?;
            let page_id = buffer_pool.create_page()?;
            let page = buffer_pool.fetch_page(page_id)?;
            page.data_mut()?[10] = 10;
        }

        let mut disk = DiskManager::open(&file_path)?;
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(PageId(0), &mut buf)?;
        assert_eq!(buf[10], 10);

        Ok(())
    }

    #[test]
    fn test_leaf_view_over_handle() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(4)?;
        let page_id = buffer_pool.create_page()?;
        let page = buffer_pool.fetch_page(page_id)?;

        {
            let mut data = page.data_mut()?;
            let mut node = NodePage::new(&mut *data)?;
            node.set_node_type(NodeType::Leaf);
            LeafPage::init(node)?;
        }

        let data = page.data();
        let leaf = LeafPage::from_node(NodePage::new(&*data)?)?;
        assert_eq!(leaf.num_slots(), 0);
        assert_eq!(leaf.next_id(), None);

        Ok(())
    }

    #[test]
    fn test_stale_handle_rejected() -> Result<()> {
        let (_dir, buffer_pool) = create_test_buffer_pool(1)?;
        let page_id = buffer_pool.create_page()?;
        let stale = buffer_pool.fetch_page(page_id)?;

        // Release both pins by id, leaving the handle behind
        buffer_pool.unpin_page(page_id)?;
        buffer_pool.unpin_page(page_id)?;
        let other = buffer_pool.create_page()?;
        buffer_pool.unpin_page(other)?;
        assert_eq!(buffer_pool.pin_count(page_id), None);

        // Loaded again, into a fresh buffer
        let page = buffer_pool.fetch_page(page_id)?;
        assert!(matches!(
            stale.data_mut(),
            Err(StorageError::PageNotResident(_))
        ));
        assert!(matches!(
            stale.set_data(&[1u8; PAGE_SIZE]),
            Err(StorageError::PageNotResident(_))
        ));
        assert_eq!(stale.pin_count(), 0);
        assert!(matches!(
            stale.unpin(),
            Err(StorageError::PageNotResident(_))
        ));

        assert_eq!(page.pin_count(), 1);
        assert_eq!(buffer_pool.is_dirty(page_id), Some(false));
        page.data_mut()?[0] = 9;
        assert_eq!(buffer_pool.is_dirty(page_id), Some(true));
        page.unpin()?;

        Ok(())
    }

    #[test]
    fn test_flush_while_another_thread_writes() -> Result<()> {
        let (dir, buffer_pool) = create_test_buffer_pool(4)?;
        let first = buffer_pool.create_page()?;
        let second = buffer_pool.create_page()?;

        let (latched_tx, latched_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        // Holds a write guard on one page while fetching another
        let writer = {
            let buffer_pool = buffer_pool.clone();
            let done_tx = done_tx.clone();
            thread::spawn(move || -> StorageResult<()> {
                let page = buffer_pool.fetch_page(first)?;
                {
                    let mut data = page.data_mut()?;
                    data[0] = 1;
                    let _ = latched_tx.send(());
                    thread::sleep(Duration::from_millis(100));
                    let child = buffer_pool.fetch_page(second)?;
                    child.unpin()?;
                }
                page.unpin()?;
                let _ = done_tx.send(());
                Ok(())
            })
        };

        let flusher = {
            let buffer_pool = buffer_pool.clone();
            thread::spawn(move || -> StorageResult<()> {
                let _ = latched_rx.recv();
                buffer_pool.flush_all()?;
                let _ = done_tx.send(());
                Ok(())
            })
        };

        for _ in 0..2 {
            done_rx
                .recv_timeout(Duration::from_secs(5))
                .map_err(|_| anyhow!("writer and flusher did not both finish"))?;
        }
        writer.join().expect("writer panicked")?;
        flusher.join().expect("flusher panicked")?;

        // The flush waited for the writer and saw its byte
        assert_eq!(buffer_pool.is_dirty(first), Some(false));
        buffer_pool.unpin_page(first)?;
        buffer_pool.unpin_page(second)?;
        buffer_pool.close()?;

        let mut disk = DiskManager::open(&dir.path().join("test.db"))?;
        let mut buf = vec![0u8; PAGE_SIZE];
        disk.read_page(first, &mut buf)?;
        assert_eq!(buf[0], 1);

        Ok(())
    }
}
