//! Storage layer implementation for pagedb.
//!
//! This module provides the physical storage tier using a page-based
//! architecture. Key components:
//!
//! - **Page**: Fixed-size (4KB) blocks of data, the basic unit of I/O
//! - **DiskManager**: Owns the heap file, allocates page ids and reads/writes pages
//! - **BufferPool**: Frame table with pin counts, dirty flags and a pluggable replacer
//! - **BufferPoolManager**: The only gateway callers use to create, fetch and release pages
//! - **Page layouts**: Zero-copy views (meta, node, leaf, branch, slot directory)
//!
//! Every disk access goes through the buffer pool, so each page has exactly one
//! authoritative in-memory copy while it is cached.

pub mod buffer;
pub mod config;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPoolManager, PageHandle, PageReadGuard, PageWriteGuard};
pub use config::{ReplacerKind, StorageConfig};
pub use disk::{DiskManager, PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::PageId;
