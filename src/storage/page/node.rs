//! Generic node page: an 8-byte kind tag followed by the kind-specific body.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::utils::check_page_len;
use std::fmt;

pub const NODE_TYPE_SIZE: usize = 8;

const LEAF_TAG: &[u8; NODE_TYPE_SIZE] = b"LEAF    ";
const BRANCH_TAG: &[u8; NODE_TYPE_SIZE] = b"BRANCH  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Leaf,
    Branch,
}

impl NodeType {
    /// The space-padded on-disk tag.
    pub fn tag(self) -> &'static [u8; NODE_TYPE_SIZE] {
        match self {
            NodeType::Leaf => LEAF_TAG,
            NodeType::Branch => BRANCH_TAG,
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        if tag == LEAF_TAG {
            Some(NodeType::Leaf)
        } else if tag == BRANCH_TAG {
            Some(NodeType::Branch)
        } else {
            None
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Leaf => write!(f, "leaf"),
            NodeType::Branch => write!(f, "branch"),
        }
    }
}

pub struct NodePage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> NodePage<B> {
    pub fn new(data: B) -> StorageResult<Self> {
        check_page_len(data.as_ref().len())?;
        Ok(Self { data })
    }

    pub fn raw_tag(&self) -> &[u8] {
        &self.data.as_ref()[..NODE_TYPE_SIZE]
    }

    pub fn node_type(&self) -> StorageResult<NodeType> {
        NodeType::from_tag(self.raw_tag()).ok_or_else(|| StorageError::CorruptPage {
            tag: String::from_utf8_lossy(self.raw_tag()).into_owned(),
        })
    }

    /// Fail with `WrongNodeType` unless the tag matches `expected` exactly.
    pub fn expect_type(&self, expected: NodeType) -> StorageResult<()> {
        if self.raw_tag() != expected.tag() {
            return Err(StorageError::WrongNodeType {
                expected,
                found: String::from_utf8_lossy(self.raw_tag()).into_owned(),
            });
        }
        Ok(())
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> NodePage<B> {
    pub fn set_node_type(&mut self, node_type: NodeType) {
        self.data.as_mut()[..NODE_TYPE_SIZE].copy_from_slice(node_type.tag());
    }
}
