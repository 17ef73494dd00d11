//! Tree error types.

use metric_search::SearchError;
use metric_storage::StorageError;
use metric_types::{MetricError, ObjectId};
use thiserror::Error;

/// Errors that can occur while building or checking a tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Page store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Search failure while querying the tree
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Object id not present in the relation
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Structural invariant violated
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Invalid settings or distance
    #[error("Configuration error: {0}")]
    Config(#[from] MetricError),
}
