//! Leaf node layout.
//!
//! ```text
//! [0:8)     node tag "LEAF    "
//! [8:16)    previous sibling page id (-1 when absent)
//! [16:24)   next sibling page id (-1 when absent)
//! [24:4096) slot directory
//! ```

use crate::storage::error::StorageResult;
use crate::storage::page::node::{NodePage, NodeType, NODE_TYPE_SIZE};
use crate::storage::page::slot::SlotDirectory;
use crate::storage::page::utils::{
    read_optional_page_id, write_optional_page_id, write_page_id, PAGE_ID_SIZE,
};
use crate::storage::page::PageId;

const PREV_ID_OFFSET: usize = NODE_TYPE_SIZE;
const NEXT_ID_OFFSET: usize = PREV_ID_OFFSET + PAGE_ID_SIZE;
pub const LEAF_HEADER_SIZE: usize = 2 * PAGE_ID_SIZE;
const SLOT_DIRECTORY_OFFSET: usize = NODE_TYPE_SIZE + LEAF_HEADER_SIZE;

pub struct LeafPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> LeafPage<B> {
    /// View an existing leaf. The node must already carry the leaf tag.
    pub fn from_node(node: NodePage<B>) -> StorageResult<Self> {
        node.expect_type(NodeType::Leaf)?;
        Ok(Self {
            data: node.into_inner(),
        })
    }

    pub fn prev_id(&self) -> Option<PageId> {
        read_optional_page_id(self.data.as_ref(), PREV_ID_OFFSET)
    }

    pub fn next_id(&self) -> Option<PageId> {
        read_optional_page_id(self.data.as_ref(), NEXT_ID_OFFSET)
    }

    pub fn slots(&self) -> SlotDirectory<&[u8]> {
        SlotDirectory::new(self.data.as_ref(), SLOT_DIRECTORY_OFFSET)
    }

    pub fn num_slots(&self) -> u16 {
        self.slots().num_slots()
    }

    pub fn free_space(&self) -> u16 {
        self.slots().free_space()
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafPage<B> {
    /// Initialise a freshly tagged leaf: no siblings, empty slot directory.
    pub fn init(node: NodePage<B>) -> StorageResult<Self> {
        let mut leaf = Self::from_node(node)?;
        leaf.reset();
        Ok(leaf)
    }

    pub fn reset(&mut self) {
        let data = self.data.as_mut();
        write_page_id(data, PREV_ID_OFFSET, PageId::INVALID);
        write_page_id(data, NEXT_ID_OFFSET, PageId::INVALID);
        self.slots_mut().reset();
    }

    pub fn set_prev_id(&mut self, prev_id: Option<PageId>) -> StorageResult<()> {
        write_optional_page_id(self.data.as_mut(), PREV_ID_OFFSET, prev_id)
    }

    pub fn set_next_id(&mut self, next_id: Option<PageId>) -> StorageResult<()> {
        write_optional_page_id(self.data.as_mut(), NEXT_ID_OFFSET, next_id)
    }

    pub fn slots_mut(&mut self) -> SlotDirectory<&mut [u8]> {
        SlotDirectory::new(self.data.as_mut(), SLOT_DIRECTORY_OFFSET)
    }
}
