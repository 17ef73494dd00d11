//! # metric-search
//!
//! Incremental best-first similarity search.
//!
//! A `PrioritySearcher` produces candidates in approximately increasing
//! distance order, exposing cheap bounds before the exact distance is
//! computed. Callers drive it with `advance()` and may narrow the cutoff at
//! any time; `get_knn` and `get_range` are built on top of that loop.
//!
//! ## Features
//! - Linear-scan searcher for relations without an index
//! - Exact-refinement decorator emitting exact distances in order
//! - Distance-space transform decorator (squared index, linear queries)
//! - Identity-lookup adapters turning value searchers into id searchers

pub mod by_id;
pub mod error;
pub mod exact;
pub mod knn;
pub mod linear;
pub mod searcher;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

pub use by_id::{ByIdSearcher, LinearScanByIdSearcher};
pub use error::SearchError;
pub use exact::ExactPrioritySearcher;
pub use knn::{DistanceList, KnnHeap, KnnList, Neighbor, NeighborList};
pub use linear::LinearScanPrioritySearcher;
pub use searcher::{LinearScan, PrioritySearcher};
pub use transform::{DistanceTransform, Square, SquareRoot, TransformedSearcher};
