//! Neighbor lists and the bounded kNN heap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use metric_types::ObjectId;

/// An object paired with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: ObjectId,
    pub distance: f64,
}

impl Neighbor {
    pub fn new(id: ObjectId, distance: f64) -> Self {
        Self { id, distance }
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Neighbors sorted by ascending distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborList {
    neighbors: Vec<Neighbor>,
}

/// Result of a k-nearest-neighbor query.
pub type KnnList = NeighborList;

/// Result of a range query.
pub type DistanceList = NeighborList;

impl NeighborList {
    /// Build a list, sorting by distance (ties by id).
    pub fn from_unsorted(mut neighbors: Vec<Neighbor>) -> Self {
        neighbors.sort();
        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.neighbors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Neighbor> {
        self.neighbors.get(index)
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.neighbors.iter().map(|n| n.id).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.neighbors.iter().map(|n| n.distance).collect()
    }

    /// Distance of the farthest neighbor, `NaN` when empty.
    pub fn max_distance(&self) -> f64 {
        self.neighbors.last().map_or(f64::NAN, |n| n.distance)
    }

    pub fn into_vec(self) -> Vec<Neighbor> {
        self.neighbors
    }
}

impl<'a> IntoIterator for &'a NeighborList {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.neighbors.iter()
    }
}

/// Bounded max-heap retaining the `k` closest neighbors seen so far.
#[derive(Debug, Clone)]
pub struct KnnHeap {
    k: usize,
    heap: BinaryHeap<Neighbor>,
}

impl KnnHeap {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Current k-th best distance, infinite until the heap is full.
    pub fn kth_distance(&self) -> f64 {
        if self.is_full() {
            self.heap.peek().map_or(f64::INFINITY, |n| n.distance)
        } else {
            f64::INFINITY
        }
    }

    /// Offer a neighbor. Returns true if the heap changed.
    pub fn insert(&mut self, id: ObjectId, distance: f64) -> bool {
        if self.k == 0 {
            return false;
        }
        if !self.is_full() {
            self.heap.push(Neighbor::new(id, distance));
            return true;
        }
        if distance < self.kth_distance() {
            self.heap.pop();
            self.heap.push(Neighbor::new(id, distance));
            return true;
        }
        false
    }

    pub fn into_list(self) -> KnnList {
        NeighborList::from_unsorted(self.heap.into_vec())
    }
}
