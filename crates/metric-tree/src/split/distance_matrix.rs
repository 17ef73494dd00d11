//! Pairwise distances among the entries of one node.

use metric_types::{Entry, ObjectId};

/// Symmetric `n×n` distance matrix with a zero diagonal.
///
/// Built once per split and discarded afterwards.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances between the routing objects of
    /// `entries`, evaluating `distance` exactly `n(n-1)/2` times.
    pub fn compute<F>(entries: &[Entry], distance: F) -> Self
    where
        F: Fn(ObjectId, ObjectId) -> f64,
    {
        let size = entries.len();
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            let a = entries[i].routing_object();
            for j in (i + 1)..size {
                let d = distance(a, entries[j].routing_object());
                values[i * size + j] = d;
                values[j * size + i] = d;
            }
        }
        Self { size, values }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.size && j < self.size, "matrix index out of range");
        self.values[i * self.size + j]
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
