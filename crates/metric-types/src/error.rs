//! Error types shared across the metric tree crates.

use thiserror::Error;

use crate::ids::ObjectId;

/// Errors raised by configuration loading and relation lookups.
#[derive(Debug, Error)]
pub enum MetricError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Object id not present in the relation
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
}
