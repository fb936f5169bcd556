//! Meta page: the page a tree handle names, holding the tree's root pointer.
//!
//! ```text
//! [0:8)     root page id (u64 LE)
//! [8:4096)  reserved
//! ```

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::utils::{check_page_len, read_page_id, write_page_id};
use crate::storage::page::PageId;

const ROOT_ID_OFFSET: usize = 0;

pub struct MetaPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> MetaPage<B> {
    pub fn new(data: B) -> StorageResult<Self> {
        check_page_len(data.as_ref().len())?;
        Ok(Self { data })
    }

    pub fn root_id(&self) -> PageId {
        read_page_id(self.data.as_ref(), ROOT_ID_OFFSET)
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> MetaPage<B> {
    pub fn set_root_id(&mut self, root_id: PageId) -> StorageResult<()> {
        if !root_id.is_valid() {
            return Err(StorageError::InvalidPageId(root_id));
        }
        write_page_id(self.data.as_mut(), ROOT_ID_OFFSET, root_id);
        Ok(())
    }
}
