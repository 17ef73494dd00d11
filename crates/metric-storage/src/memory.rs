//! In-memory page arena.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use metric_types::{Node, NodeId};
use tracing::trace;

use crate::error::StorageError;
use crate::store::PageStore;

/// Arena of node slots addressed by `NodeId`.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: RwLock<Vec<Node>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of page reads served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of page writes performed.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl PageStore for MemoryPageStore {
    fn read_node(&self, id: NodeId) -> Result<Node, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let pages = self.pages.read().expect("page arena lock poisoned");
        pages
            .get(id.index())
            .cloned()
            .ok_or(StorageError::PageNotFound(id))
    }

    fn write_node(&self, node: &mut Node) -> Result<NodeId, StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut pages = self.pages.write().expect("page arena lock poisoned");
        match node.page_id {
            Some(id) => {
                let slot = pages
                    .get_mut(id.index())
                    .ok_or(StorageError::PageNotFound(id))?;
                *slot = node.clone();
                Ok(id)
            }
            None => {
                let index = u32::try_from(pages.len())
                    .map_err(|_| StorageError::Backend("page arena is full".to_string()))?;
                let id = NodeId(index);
                node.page_id = Some(id);
                pages.push(node.clone());
                trace!(page = %id, "Allocated page");
                Ok(id)
            }
        }
    }

    fn page_count(&self) -> usize {
        self.pages.read().expect("page arena lock poisoned").len()
    }
}
