//! # metric-types
//!
//! Shared domain types for the metric tree and its search protocol.
//!
//! This crate defines the data structures every other crate agrees on:
//! - Ids: `ObjectId` for relation objects, `NodeId` for tree pages
//! - Entries and nodes: the fixed-capacity pages of an M-tree
//! - Distances: the `Distance` collaborator and a few stock metrics
//! - Relations: id to value lookup
//! - Settings: layered tree configuration
//!
//! ## Usage
//!
//! ```rust
//! use metric_types::{Distance, EuclideanDistance};
//!
//! let d = EuclideanDistance.distance(&vec![0.0, 0.0], &vec![3.0, 4.0]);
//! assert_eq!(d, 5.0);
//! ```

pub mod config;
pub mod distance;
pub mod entry;
pub mod error;
pub mod ids;
pub mod node;
pub mod relation;

pub use config::{SplitSettings, SplitStrategyKind, TreeSettings};
pub use distance::{
    Distance, DistanceKind, EuclideanDistance, ManhattanDistance, SquaredEuclideanDistance,
};
pub use entry::Entry;
pub use error::MetricError;
pub use ids::{NodeId, ObjectId};
pub use node::{Node, NodeKind};
pub use relation::{Relation, VecRelation};
