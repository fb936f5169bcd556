use crate::storage::buffer::BufferPoolManager;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{LeafPage, MetaPage, NodePage, NodeType, PageId};
use log::{debug, trace, warn};

/// Handle to a B+Tree stored in the buffer pool.
///
/// The tree itself is only the id of its meta page; the meta page's root
/// pointer and the pages beneath it are the structure. The meta and root
/// pages stay pinned for as long as the tree exists, each holding the
/// reference taken when it was created plus the one taken when it was first
/// fetched. [`clear`](Self::clear) gives both back.
#[derive(Debug)]
pub struct BTree {
    meta_id: PageId,
}

impl BTree {
    /// Create a meta page and an empty leaf as root.
    ///
    /// On failure every pin taken so far is given back, so a failed create
    /// leaves nothing held in the pool.
    pub fn create(buffer_pool: &BufferPoolManager) -> StorageResult<Self> {
        let mut pinned = Vec::with_capacity(4);
        match Self::build(buffer_pool, &mut pinned) {
            Ok(meta_id) => {
                debug!("created btree with meta page {}", meta_id);
                Ok(Self { meta_id })
            }
            Err(e) => {
                for page_id in pinned {
                    if let Err(unpin_err) = buffer_pool.unpin_page(page_id) {
                        warn!("failed to release page {}: {}", page_id, unpin_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// Lay out the meta and root pages, recording each pin in `pinned` as it
    /// is taken.
    fn build(buffer_pool: &BufferPoolManager, pinned: &mut Vec<PageId>) -> StorageResult<PageId> {
        let meta_id = buffer_pool.create_page()?;
        pinned.push(meta_id);
        let meta_page = buffer_pool.fetch_page(meta_id)?;
        pinned.push(meta_id);

        let root_id = buffer_pool.create_page()?;
        pinned.push(root_id);
        let root_page = buffer_pool.fetch_page(root_id)?;
        pinned.push(root_id);

        {
            let mut data = meta_page.data_mut()?;
            MetaPage::new(&mut *data)?.set_root_id(root_id)?;
        }

        // The root starts out as a leaf
        {
            let mut data = root_page.data_mut()?;
            let mut node = NodePage::new(&mut *data)?;
            node.set_node_type(NodeType::Leaf);
            LeafPage::init(node)?;
        }

        trace!("btree root is page {}", root_id);
        Ok(meta_id)
    }

    pub fn meta_id(&self) -> PageId {
        self.meta_id
    }

    /// Read the root pointer from the meta page.
    pub fn root_id(&self, buffer_pool: &BufferPoolManager) -> StorageResult<PageId> {
        let meta_page = buffer_pool.fetch_page(self.meta_id)?;
        let root_id = MetaPage::new(&*meta_page.data())?.root_id();
        meta_page.unpin()?;
        Ok(root_id)
    }

    /// Release the pins the tree has held on its meta and root pages since
    /// creation and forget the meta page.
    pub fn clear(&mut self, buffer_pool: &BufferPoolManager) -> StorageResult<()> {
        let root_id = self.root_id(buffer_pool)?;

        for page_id in [self.meta_id, root_id] {
            // creation pin, then first fetch pin
            buffer_pool.unpin_page(page_id)?;
            buffer_pool.unpin_page(page_id)?;
        }

        debug!("cleared btree with meta page {}", self.meta_id);
        self.meta_id = PageId::INVALID;
        Ok(())
    }
}
