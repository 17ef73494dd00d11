//! Storage layer error types.

use metric_types::NodeId;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// Page was never written
    #[error("Page not found: {0}")]
    PageNotFound(NodeId),

    /// Backend failure reported by the underlying store
    #[error("Storage backend error: {0}")]
    Backend(String),
}
