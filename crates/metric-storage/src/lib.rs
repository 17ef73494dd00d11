//! Page storage for metric tree nodes.
//!
//! Provides:
//! - The `PageStore` contract the tree consumes (`read_node`, `write_node`)
//! - An in-memory arena store addressed by `NodeId`
//! - A write-through LRU page cache over any store

pub mod cache;
pub mod error;
pub mod memory;
pub mod store;

pub use cache::{CacheStats, CachedPageStore};
pub use error::StorageError;
pub use memory::MemoryPageStore;
pub use store::PageStore;
