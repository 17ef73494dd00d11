//! The priority searcher protocol.
//!
//! A searcher session starts with `search(query)`, which resets the cutoff
//! to infinity and positions the searcher on its first candidate. The caller
//! then inspects the current candidate (`candidate`, bounds, exact distance)
//! and moves on with `advance()` until `is_valid()` turns false.
//!
//! Candidates arrive in approximately increasing distance order:
//! `all_lower_bound()` never decreases across `advance()` calls and no
//! future candidate is closer than it. The exact distances of individual
//! candidates may still arrive out of order; wrap a searcher in
//! `ExactPrioritySearcher` to sort them.

use metric_types::ObjectId;
use tracing::debug;

use crate::error::SearchError;
use crate::knn::{DistanceList, KnnHeap, KnnList, Neighbor, NeighborList};

/// Incremental best-first search over objects.
///
/// Searchers are single-session and not thread-safe: every operation
/// mutates the current position, cutoff or internal queues.
pub trait PrioritySearcher {
    /// What a search is started from: an object value or an object id.
    type Query: ?Sized;

    /// Start a new search for `query`, discarding all previous state.
    fn search(&mut self, query: &Self::Query) -> Result<(), SearchError>;

    /// Start a new search and immediately narrow the cutoff.
    fn search_with_cutoff(
        &mut self,
        query: &Self::Query,
        threshold: f64,
    ) -> Result<(), SearchError> {
        self.search(query)?;
        self.decrease_cutoff(threshold);
        Ok(())
    }

    /// Narrow the pruning bound to `threshold`.
    ///
    /// The cutoff may only shrink. Candidates beyond the old cutoff may
    /// already have been discarded, so raising it again is undefined
    /// behaviour: results beyond the previous bound will silently be
    /// missing. Debug builds assert on it.
    fn decrease_cutoff(&mut self, threshold: f64);

    /// Current pruning bound.
    fn cutoff(&self) -> f64;

    /// True if the searcher is positioned on a candidate.
    fn is_valid(&self) -> bool;

    /// Move to the next candidate. Must only be called while valid.
    fn advance(&mut self) -> Result<(), SearchError>;

    /// Id of the current candidate.
    fn candidate(&self) -> Option<ObjectId>;

    /// Exact distance between the query and the current candidate.
    ///
    /// May be expensive; implementations cache it where they can.
    fn compute_exact_distance(&mut self) -> f64;

    /// Lower bound of the current candidate's distance, `NaN` if unknown.
    fn lower_bound(&self) -> f64 {
        f64::NAN
    }

    /// Upper bound of the current candidate's distance, `NaN` if unknown.
    fn upper_bound(&self) -> f64 {
        f64::NAN
    }

    /// Estimated distance of the current candidate, `NaN` if unknown.
    fn approximate_distance(&self) -> f64 {
        f64::NAN
    }

    /// Maximum error of `approximate_distance`, `NaN` if unknown.
    fn approximate_accuracy(&self) -> f64 {
        f64::NAN
    }

    /// Lower bound for the current and all future candidates.
    ///
    /// 0 when the searcher cannot prune (a linear scan).
    fn all_lower_bound(&self) -> f64 {
        0.0
    }

    /// True if this searcher is a plain linear scan rather than an index.
    fn is_linear_scan(&self) -> bool {
        false
    }

    /// Find the `k` nearest neighbors of `query`.
    ///
    /// Exact distances are only computed for candidates whose lower bound
    /// can still beat the current k-th distance, and the searcher's cutoff
    /// follows the k-th distance once `k` results are known.
    fn get_knn(&mut self, query: &Self::Query, k: usize) -> Result<KnnList, SearchError> {
        let mut heap = KnnHeap::new(k);
        if k == 0 {
            return Ok(heap.into_list());
        }

        let mut examined = 0usize;
        self.search(query)?;
        while self.is_valid() {
            let threshold = heap.kth_distance();
            if self.all_lower_bound() > threshold {
                break;
            }
            // NaN bounds never prune
            if !(self.lower_bound() > threshold) {
                if let Some(id) = self.candidate() {
                    let distance = self.compute_exact_distance();
                    examined += 1;
                    if heap.insert(id, distance) && heap.is_full() {
                        self.decrease_cutoff(heap.kth_distance());
                    }
                }
            }
            self.advance()?;
        }

        let result = heap.into_list();
        debug!(k, found = result.len(), examined, "kNN search complete");
        Ok(result)
    }

    /// Find every object within `radius` of `query`.
    fn get_range(&mut self, query: &Self::Query, radius: f64) -> Result<DistanceList, SearchError> {
        let mut neighbors = Vec::new();
        self.search_with_cutoff(query, radius)?;
        while self.is_valid() {
            if self.all_lower_bound() > radius {
                break;
            }
            if !(self.lower_bound() > radius) {
                if let Some(id) = self.candidate() {
                    let distance = self.compute_exact_distance();
                    if distance <= radius {
                        neighbors.push(Neighbor::new(id, distance));
                    }
                }
            }
            self.advance()?;
        }

        debug!(radius, found = neighbors.len(), "Range search complete");
        Ok(NeighborList::from_unsorted(neighbors))
    }
}

/// Marker for searchers that scan the whole relation.
///
/// Callers use it to recognise, at the type level, that no index is in
/// play; `PrioritySearcher::is_linear_scan` answers the same question for
/// boxed searchers.
pub trait LinearScan {}

impl<S: PrioritySearcher + ?Sized> PrioritySearcher for Box<S> {
    type Query = S::Query;

    fn search(&mut self, query: &Self::Query) -> Result<(), SearchError> {
        (**self).search(query)
    }

    fn search_with_cutoff(
        &mut self,
        query: &Self::Query,
        threshold: f64,
    ) -> Result<(), SearchError> {
        (**self).search_with_cutoff(query, threshold)
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        (**self).decrease_cutoff(threshold)
    }

    fn cutoff(&self) -> f64 {
        (**self).cutoff()
    }

    fn is_valid(&self) -> bool {
        (**self).is_valid()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        (**self).advance()
    }

    fn candidate(&self) -> Option<ObjectId> {
        (**self).candidate()
    }

    fn compute_exact_distance(&mut self) -> f64 {
        (**self).compute_exact_distance()
    }

    fn lower_bound(&self) -> f64 {
        (**self).lower_bound()
    }

    fn upper_bound(&self) -> f64 {
        (**self).upper_bound()
    }

    fn approximate_distance(&self) -> f64 {
        (**self).approximate_distance()
    }

    fn approximate_accuracy(&self) -> f64 {
        (**self).approximate_accuracy()
    }

    fn all_lower_bound(&self) -> f64 {
        (**self).all_lower_bound()
    }

    fn is_linear_scan(&self) -> bool {
        (**self).is_linear_scan()
    }
}
