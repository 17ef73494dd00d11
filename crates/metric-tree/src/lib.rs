//! # metric-tree
//!
//! M-tree metric index for similarity search under arbitrary distances.
//!
//! The tree needs nothing but a distance satisfying the triangle
//! inequality: no coordinates, no bounding boxes. Nodes are pages in a
//! `PageStore`; overflowing nodes are split by a pluggable strategy that
//! promotes two routing objects and partitions the entries between them.
//!
//! ## Features
//! - Farthest-pair (MLB_DIST) and seeded random split strategies
//! - Balanced partition with at most one entry of size difference
//! - Best-first priority searcher with lazy exact distances
//! - Query builder choosing between the index, a transformed index, and a
//!   linear scan
//! - Full integrity check of parent distances and covering radii
//!
//! ## Usage
//!
//! ```rust
//! use metric_search::PrioritySearcher;
//! use metric_tree::MTree;
//! use metric_types::{EuclideanDistance, Relation, TreeSettings, VecRelation};
//!
//! let relation = VecRelation::new(vec![vec![0.0], vec![3.0], vec![1.0], vec![4.0]]);
//! let mut tree = MTree::in_memory(&relation, EuclideanDistance, TreeSettings::default()).unwrap();
//! tree.insert_all(relation.ids()).unwrap();
//!
//! let knn = tree.priority_searcher().get_knn(&vec![0.5], 2).unwrap();
//! assert_eq!(knn.distances(), vec![0.5, 0.5]);
//! ```

pub mod error;
pub mod query;
pub mod searcher;
pub mod split;
pub mod tree;

pub use error::TreeError;
pub use query::{IdSearcher, ObjectSearcher, PriorityIndex, QueryBuilder};
pub use searcher::MTreePrioritySearcher;
pub use split::{
    balanced_partition, strategy_from_settings, Assignment, DistanceEntry, DistanceMatrix,
    FarthestPairSplit, LiveDistances, PivotDistances, RandomSplit, SplitStrategy,
};
pub use tree::{MTree, TreeStats};
