//! Exact-refinement decorator.
//!
//! Turns a searcher that reports bounded candidates into one that reports
//! candidates in non-decreasing order of exact distance.
//!
//! Refined candidates wait in a min-heap keyed by exact distance. The heap
//! top is only reported once the inner searcher's `all_lower_bound()`
//! reaches it, i.e. once no unrefined inner candidate can still be closer.
//! Every candidate pulled from the inner searcher is refined immediately;
//! there is no second queue of lower-bound-only candidates.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use metric_types::ObjectId;
use tracing::trace;

use crate::error::SearchError;
use crate::knn::Neighbor;
use crate::searcher::PrioritySearcher;

/// Searcher reporting exact distances in ascending order.
pub struct ExactPrioritySearcher<S> {
    inner: S,
    heap: BinaryHeap<Reverse<Neighbor>>,
    threshold: f64,
    current: Option<Neighbor>,
}

impl<S> ExactPrioritySearcher<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            heap: BinaryHeap::new(),
            threshold: f64::INFINITY,
            current: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Number of refined candidates waiting to be reported.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    fn best_pending(&self) -> f64 {
        self.heap
            .peek()
            .map_or(f64::INFINITY, |Reverse(n)| n.distance)
    }

    /// Drop pending candidates that no longer satisfy the cutoff.
    fn discard_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if top.distance <= self.threshold {
                break;
            }
            // Min-heap: once the best is stale, all of them are.
            self.heap.clear();
        }
    }

    /// Pull from the inner searcher until the heap top is confirmed.
    fn refill(&mut self) -> Result<(), SearchError>
    where
        S: PrioritySearcher,
    {
        while self.inner.is_valid() {
            let all_lower = self.inner.all_lower_bound();
            if all_lower > self.threshold {
                break;
            }
            if !self.heap.is_empty() && !(all_lower < self.best_pending()) {
                break;
            }

            let lower = self.inner.lower_bound();
            if !(lower > self.threshold) {
                let upper = self.inner.upper_bound();
                let distance = if lower == upper {
                    lower
                } else {
                    self.inner.compute_exact_distance()
                };
                if distance <= self.threshold {
                    if let Some(id) = self.inner.candidate() {
                        self.heap.push(Reverse(Neighbor::new(id, distance)));
                    }
                }
            }
            self.inner.advance()?;
        }
        Ok(())
    }
}

impl<S: PrioritySearcher> PrioritySearcher for ExactPrioritySearcher<S> {
    type Query = S::Query;

    fn search(&mut self, query: &S::Query) -> Result<(), SearchError> {
        self.heap.clear();
        self.current = None;
        self.threshold = f64::INFINITY;
        self.inner.search(query)?;
        self.advance()
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        debug_assert!(
            threshold <= self.threshold,
            "cutoff must only decrease: {} > {}",
            threshold,
            self.threshold
        );
        self.threshold = threshold;
        self.inner.decrease_cutoff(threshold);
    }

    fn cutoff(&self) -> f64 {
        self.threshold
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        self.discard_stale();
        self.refill()?;
        self.discard_stale();
        self.current = self.heap.pop().map(|Reverse(n)| n);
        if let Some(n) = self.current {
            trace!(id = %n.id, distance = n.distance, pending = self.heap.len(), "Refined candidate");
        }
        Ok(())
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.current.map(|n| n.id)
    }

    fn compute_exact_distance(&mut self) -> f64 {
        self.current.map_or(f64::NAN, |n| n.distance)
    }

    fn lower_bound(&self) -> f64 {
        self.current.map_or(f64::NAN, |n| n.distance)
    }

    fn upper_bound(&self) -> f64 {
        self.current.map_or(f64::NAN, |n| n.distance)
    }

    fn approximate_distance(&self) -> f64 {
        self.current.map_or(f64::NAN, |n| n.distance)
    }

    fn approximate_accuracy(&self) -> f64 {
        self.current.map_or(f64::NAN, |_| 0.0)
    }

    fn all_lower_bound(&self) -> f64 {
        self.current.map_or(f64::NAN, |n| n.distance)
    }

    fn is_linear_scan(&self) -> bool {
        self.inner.is_linear_scan()
    }
}
