//! Page store contract.

use std::sync::Arc;

use metric_types::{Node, NodeId};

use crate::error::StorageError;

/// Storage for tree nodes, addressed by page id.
///
/// Implementations must be safe to share across threads. Errors are
/// returned unchanged to the caller; stores do not retry.
pub trait PageStore: Send + Sync {
    /// Read the node stored at `id`.
    fn read_node(&self, id: NodeId) -> Result<Node, StorageError>;

    /// Write a node. A node without a page id is assigned a fresh one,
    /// otherwise its page is overwritten. Returns the page id.
    fn write_node(&self, node: &mut Node) -> Result<NodeId, StorageError>;

    /// Number of allocated pages.
    fn page_count(&self) -> usize;
}

impl<S: PageStore + ?Sized> PageStore for Arc<S> {
    fn read_node(&self, id: NodeId) -> Result<Node, StorageError> {
        (**self).read_node(id)
    }

    fn write_node(&self, node: &mut Node) -> Result<NodeId, StorageError> {
        (**self).write_node(node)
    }

    fn page_count(&self) -> usize {
        (**self).page_count()
    }
}
