//! Branch node layout.
//!
//! ```text
//! [0:8)     node tag "BRANCH  "
//! [8:16)    right child page id (-1 when absent)
//! [16:4096) slot directory
//! ```

use crate::storage::error::StorageResult;
use crate::storage::page::node::{NodePage, NodeType, NODE_TYPE_SIZE};
use crate::storage::page::slot::SlotDirectory;
use crate::storage::page::utils::{
    read_optional_page_id, write_optional_page_id, write_page_id, PAGE_ID_SIZE,
};
use crate::storage::page::PageId;

const RIGHT_ID_OFFSET: usize = NODE_TYPE_SIZE;
pub const BRANCH_HEADER_SIZE: usize = PAGE_ID_SIZE;
const SLOT_DIRECTORY_OFFSET: usize = NODE_TYPE_SIZE + BRANCH_HEADER_SIZE;

pub struct BranchPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> BranchPage<B> {
    pub fn from_node(node: NodePage<B>) -> StorageResult<Self> {
        node.expect_type(NodeType::Branch)?;
        Ok(Self {
            data: node.into_inner(),
        })
    }

    pub fn right_id(&self) -> Option<PageId> {
        read_optional_page_id(self.data.as_ref(), RIGHT_ID_OFFSET)
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

impl<B: AsRef<[u8]> + AsMut<[u8]>> BranchPage<B> {
    pub fn init(node: NodePage<B>) -> StorageResult<Self> {
        let mut branch = Self::from_node(node)?;
        branch.reset();
        Ok(branch)
    }

    pub fn reset(&mut self) {
        write_page_id(self.data.as_mut(), RIGHT_ID_OFFSET, PageId::INVALID);
        self.slots_mut().reset();
    }

    pub fn set_right_id(&mut self, right_id: Option<PageId>) -> StorageResult<()> {
        write_optional_page_id(self.data.as_mut(), RIGHT_ID_OFFSET, right_id)
    }

    pub fn slots_mut(&mut self) -> SlotDirectory<&mut [u8]> {
        SlotDirectory::new(self.data.as_mut(), SLOT_DIRECTORY_OFFSET)
    }
}
