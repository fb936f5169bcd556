//! Storage layer error types.

use crate::storage::page::node::NodeType;
use crate::storage::page::PageId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt heap file: length {len} is not a multiple of the page size")]
    CorruptHeapFile { len: u64 },

    #[error("Wrong node type: expected {expected}, found {found:?}")]
    WrongNodeType { expected: NodeType, found: String },

    #[error("Corrupt page: unknown node tag {tag:?}")]
    CorruptPage { tag: String },

    #[error("Buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    #[error("Page {0} is not pinned")]
    PageNotPinned(PageId),

    #[error("Page {0} is not resident in the buffer pool")]
    PageNotResident(PageId),

    #[error("Buffer pool is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
