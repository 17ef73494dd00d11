//! Write-through LRU page cache.
//!
//! Reads are served from the cache when possible; every write goes to the
//! underlying store first and only then refreshes the cached copy, so the
//! cache never holds a page newer or older than the store.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use lru::LruCache;
use metric_types::{Node, NodeId};
use tracing::trace;

use crate::error::StorageError;
use crate::store::PageStore;

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// LRU cache in front of a page store.
pub struct CachedPageStore<S> {
    inner: S,
    cache: Mutex<LruCache<NodeId, Node>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<S: PageStore> CachedPageStore<S> {
    /// Wrap `inner` with a cache holding up to `capacity` pages.
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(capacity.max(1)).expect("cache capacity must be > 0 after max(1)");
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached page.
    pub fn clear(&self) {
        self.cache.lock().expect("cache mutex poisoned").clear();
    }

    fn remember(&self, id: NodeId, node: Node) {
        let mut cache = self.cache.lock().expect("cache mutex poisoned");
        if let Some((evicted, _)) = cache.push(id, node) {
            if evicted != id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                trace!(page = %evicted, "Evicted page from cache");
            }
        }
    }
}

impl<S: PageStore> PageStore for CachedPageStore<S> {
    fn read_node(&self, id: NodeId) -> Result<Node, StorageError> {
        let cached = {
            let mut cache = self.cache.lock().expect("cache mutex poisoned");
            cache.get(&id).cloned()
        };
        if let Some(node) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(node);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let node = self.inner.read_node(id)?;
        self.remember(id, node.clone());
        Ok(node)
    }

    fn write_node(&self, node: &mut Node) -> Result<NodeId, StorageError> {
        let id = self.inner.write_node(node)?;
        self.remember(id, node.clone());
        Ok(id)
    }

    fn page_count(&self) -> usize {
        self.inner.page_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPageStore;
    use metric_types::{Entry, ObjectId};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn leaf_with(object: u32) -> Node {
        let mut node = Node::new_leaf();
        node.add_entry(Entry::leaf(ObjectId(object), 0.0));
        node
    }

    #[test]
    fn test_read_after_write_hits_cache() {
        let store = CachedPageStore::new(MemoryPageStore::new(), 4);
        let mut node = leaf_with(1);
        let id = store.write_node(&mut node).unwrap();

        let read = store.read_node(id).unwrap();
        assert_eq!(read, node);
        assert_eq!(store.stats().hits, 1);
        assert_eq!(store.stats().misses, 0);
        assert_eq!(store.inner().reads(), 0);
    }

    #[test]
    fn test_eviction_falls_back_to_store() {
        let store = CachedPageStore::new(MemoryPageStore::new(), 2);
        let ids: Vec<NodeId> = (0..3)
            .map(|i| store.write_node(&mut leaf_with(i)).unwrap())
            .collect();

        assert_eq!(store.stats().evictions, 1);
        let first = store.read_node(ids[0]).unwrap();
        assert_eq!(first.entry(0).routing_object(), ObjectId(0));
        assert_eq!(store.stats().misses, 1);
        assert_eq!(store.inner().reads(), 1);
    }

    #[test]
    fn test_overwrite_refreshes_cached_copy() {
        let store = CachedPageStore::new(MemoryPageStore::new(), 2);
        let mut node = leaf_with(1);
        let id = store.write_node(&mut node).unwrap();

        node.add_entry(Entry::leaf(ObjectId(2), 1.0));
        store.write_node(&mut node).unwrap();

        assert_eq!(store.read_node(id).unwrap().len(), 2);
    }

    #[test]
    fn test_random_access_matches_backing_store() {
        let store = CachedPageStore::new(MemoryPageStore::new(), 3);
        let ids: Vec<NodeId> = (0..10)
            .map(|i| store.write_node(&mut leaf_with(i)).unwrap())
            .collect();

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let id = ids[rng.random_range(0..ids.len())];
            let cached = store.read_node(id).unwrap();
            let direct = store.inner().read_node(id).unwrap();
            assert_eq!(cached, direct);
        }
        let stats = store.stats();
        assert_eq!(stats.hits + stats.misses, 200);
    }

    #[test]
    fn test_missing_page_is_not_cached() {
        let store = CachedPageStore::new(MemoryPageStore::new(), 2);
        assert!(store.read_node(NodeId(9)).is_err());
        assert!(store.read_node(NodeId(9)).is_err());
        assert_eq!(store.stats().misses, 2);
    }
}
