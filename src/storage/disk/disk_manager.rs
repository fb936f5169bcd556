use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use log::{debug, trace};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub const PAGE_SIZE: usize = 4096;

/// Owns the single heap file. Page `i` lives at byte range
/// `[i * PAGE_SIZE, (i + 1) * PAGE_SIZE)`; the file has no header.
pub struct DiskManager {
    file: File,
    next_page_id: PageId,
}

impl DiskManager {
    /// Create a fresh heap file, truncating any existing one.
    pub fn create(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        debug!("created heap file {:?}", path);

        Self::from_file(file)
    }

    /// Open a heap file, creating it if it does not exist yet.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let manager = Self::from_file(file)?;
        debug!(
            "opened heap file {:?}, next page id {}",
            path, manager.next_page_id
        );
        Ok(manager)
    }

    /// Open an existing heap file for inspection. Every write fails.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Self::from_file(file)
    }

    fn from_file(file: File) -> StorageResult<Self> {
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(StorageError::CorruptHeapFile { len });
        }

        Ok(Self {
            file,
            next_page_id: PageId((len / PAGE_SIZE as u64) as i64),
        })
    }

    /// Hand out the next page id. Nothing is written until the page is first
    /// flushed.
    pub fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id = PageId(page_id.0 + 1);
        trace!("allocated page {}", page_id);
        page_id
    }

    pub fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> StorageResult<()> {
        self.seek_to(page_id, buf.len())?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write a full page and sync it before returning.
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        self.seek_to(page_id, data.len())?;
        self.file.write_all(data)?;
        self.file.sync_all()?;
        trace!("wrote page {}", page_id);
        Ok(())
    }

    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Sync and release the file handle.
    pub fn close(self) -> StorageResult<()> {
        self.file.sync_all()?;
        debug!("closed heap file, next page id {}", self.next_page_id);
        Ok(())
    }

    pub fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    /// Number of pages currently materialized in the file.
    pub fn num_pages(&self) -> StorageResult<u64> {
        let file_size = self.file.metadata()?.len();
        Ok(file_size / PAGE_SIZE as u64)
    }

    fn seek_to(&mut self, page_id: PageId, buf_len: usize) -> StorageResult<()> {
        if buf_len != PAGE_SIZE {
            return Err(StorageError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf_len,
            });
        }
        if !page_id.is_valid() {
            return Err(StorageError::InvalidPageId(page_id));
        }

        self.file.seek(SeekFrom::Start(page_id.offset()))?;
        Ok(())
    }
}
