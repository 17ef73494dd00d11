//! Search error types.

use metric_storage::StorageError;
use metric_types::ObjectId;
use thiserror::Error;

/// Errors that can occur while driving a searcher.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Page read failed while expanding an index node
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Query id not present in the relation
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
}
