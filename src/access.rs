//! Access layer built on top of the buffer pool.
//!
//! - **BTree**: owns a tree's meta page and keeps its meta and root pages
//!   pinned for the tree's lifetime
//!
//! Tree traversal, insert, search and split build on the page layouts in
//! [`crate::storage::page`] and are not part of this layer yet.

pub mod btree;

pub use btree::BTree;
