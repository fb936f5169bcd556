//! Page identifiers and the byte layouts carved out of a page.
//!
//! Layouts are views: they borrow a page buffer (a guard from the buffer
//! pool, a slice, or an owned array) and read or write fields in place.

pub mod branch;
pub mod leaf;
pub mod meta;
pub mod node;
pub mod slot;
pub mod utils;

use crate::storage::PAGE_SIZE;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub i64);

impl PageId {
    /// Reserved id meaning "no page".
    pub const INVALID: PageId = PageId(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Byte offset of the page inside the heap file. Only meaningful for valid ids.
    pub fn offset(self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub use branch::BranchPage;
pub use leaf::LeafPage;
pub use meta::MetaPage;
pub use node::{NodePage, NodeType};
pub use slot::SlotDirectory;
