//! Distance-space transform decorator.
//!
//! An index may be built and pruned in a monotone transform of the distance
//! callers asked for, typically squared Euclidean for Euclidean queries.
//! `TransformedSearcher` translates every bound, cutoff and exact distance
//! between the two spaces and holds no candidate state of its own.

use metric_types::ObjectId;

use crate::error::SearchError;
use crate::searcher::{LinearScan, PrioritySearcher};

/// Monotone mapping between the inner (index) and outer (caller) spaces.
pub trait DistanceTransform {
    /// Map an inner-space distance to the caller's space.
    fn to_outer(&self, inner: f64) -> f64;

    /// Map a caller-space threshold into the inner space.
    fn to_inner(&self, outer: f64) -> f64;
}

/// Inner space is squared, outer space is linear.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareRoot;

impl DistanceTransform for SquareRoot {
    fn to_outer(&self, inner: f64) -> f64 {
        inner.sqrt()
    }

    fn to_inner(&self, outer: f64) -> f64 {
        if outer <= 0.0 {
            0.0
        } else {
            outer * outer
        }
    }
}

/// Inner space is linear, outer space is squared.
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl DistanceTransform for Square {
    fn to_outer(&self, inner: f64) -> f64 {
        inner * inner
    }

    fn to_inner(&self, outer: f64) -> f64 {
        if outer <= 0.0 {
            0.0
        } else {
            outer.sqrt()
        }
    }
}

/// Searcher exposing an inner searcher's results in another distance space.
pub struct TransformedSearcher<S, T> {
    inner: S,
    transform: T,
}

impl<S, T: DistanceTransform> TransformedSearcher<S, T> {
    pub fn new(inner: S, transform: T) -> Self {
        Self { inner, transform }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PrioritySearcher, T: DistanceTransform> PrioritySearcher for TransformedSearcher<S, T> {
    type Query = S::Query;

    fn search(&mut self, query: &S::Query) -> Result<(), SearchError> {
        self.inner.search(query)
    }

    fn search_with_cutoff(&mut self, query: &S::Query, threshold: f64) -> Result<(), SearchError> {
        self.inner
            .search_with_cutoff(query, self.transform.to_inner(threshold))
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        self.inner.decrease_cutoff(self.transform.to_inner(threshold));
    }

    fn cutoff(&self) -> f64 {
        self.transform.to_outer(self.inner.cutoff())
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        self.inner.advance()
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.inner.candidate()
    }

    fn compute_exact_distance(&mut self) -> f64 {
        let inner = self.inner.compute_exact_distance();
        self.transform.to_outer(inner)
    }

    fn lower_bound(&self) -> f64 {
        self.transform.to_outer(self.inner.lower_bound())
    }

    fn upper_bound(&self) -> f64 {
        self.transform.to_outer(self.inner.upper_bound())
    }

    fn approximate_distance(&self) -> f64 {
        let (low, high) = self.approximate_interval();
        (low + high) / 2.0
    }

    fn approximate_accuracy(&self) -> f64 {
        let (low, high) = self.approximate_interval();
        (high - low) / 2.0
    }

    fn all_lower_bound(&self) -> f64 {
        self.transform.to_outer(self.inner.all_lower_bound())
    }

    fn is_linear_scan(&self) -> bool {
        self.inner.is_linear_scan()
    }
}

impl<S, T> TransformedSearcher<S, T>
where
    S: PrioritySearcher,
    T: DistanceTransform,
{
    /// The inner `approx ± accuracy` interval mapped to the outer space.
    fn approximate_interval(&self) -> (f64, f64) {
        let approx = self.inner.approximate_distance();
        let accuracy = self.inner.approximate_accuracy();
        let low = (approx - accuracy).max(0.0);
        let high = approx + accuracy;
        (self.transform.to_outer(low), self.transform.to_outer(high))
    }
}

impl<S: LinearScan, T> LinearScan for TransformedSearcher<S, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::ExactPrioritySearcher;
    use crate::test_support::ListSearcher;

    fn drain(searcher: &mut impl PrioritySearcher<Query = ()>) -> Vec<(ObjectId, f64)> {
        let mut out = Vec::new();
        searcher.search(&()).unwrap();
        while searcher.is_valid() {
            let id = searcher.candidate().unwrap();
            out.push((id, searcher.compute_exact_distance()));
            searcher.advance().unwrap();
        }
        out
    }

    #[test]
    fn test_square_root_guards_non_positive() {
        assert_eq!(SquareRoot.to_inner(0.0), 0.0);
        assert_eq!(SquareRoot.to_inner(-2.0), 0.0);
        assert_eq!(SquareRoot.to_inner(3.0), 9.0);
        assert_eq!(Square.to_inner(-1.0), 0.0);
        assert_eq!(Square.to_inner(16.0), 4.0);
    }

    #[test]
    fn test_bounds_are_transformed() {
        // Inner space is squared: lower 4, exact 9, upper 14.
        let inner = ListSearcher::bounded(&[(4.0, 9.0)]);
        let mut searcher = TransformedSearcher::new(inner, SquareRoot);
        searcher.search(&()).unwrap();
        assert_eq!(searcher.lower_bound(), 2.0);
        assert_eq!(searcher.upper_bound(), 14f64.sqrt());
        assert_eq!(searcher.compute_exact_distance(), 3.0);
        assert_eq!(searcher.all_lower_bound(), 2.0);
        assert_eq!(searcher.cutoff(), f64::INFINITY);
    }

    #[test]
    fn test_cutoff_forwarded_in_inner_space() {
        let inner = ListSearcher::exact(&[1.0, 4.0, 9.0, 16.0]);
        let mut searcher = TransformedSearcher::new(inner, SquareRoot);
        searcher.search(&()).unwrap();
        searcher.decrease_cutoff(2.5);
        assert_eq!(searcher.inner().cutoff(), 6.25);
        assert_eq!(searcher.cutoff(), 2.5);

        let range = searcher.get_range(&(), 3.0).unwrap();
        assert_eq!(range.distances(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_approximation_maps_interval() {
        let inner = ListSearcher::exact(&[16.0]);
        let mut searcher = TransformedSearcher::new(inner, SquareRoot);
        searcher.search(&()).unwrap();
        // ListSearcher reports no approximation.
        assert!(searcher.approximate_distance().is_nan());

        let exact = ExactPrioritySearcher::new(ListSearcher::exact(&[16.0]));
        let mut searcher = TransformedSearcher::new(exact, SquareRoot);
        searcher.search(&()).unwrap();
        assert_eq!(searcher.approximate_distance(), 4.0);
        assert_eq!(searcher.approximate_accuracy(), 0.0);
    }

    #[test]
    fn test_round_trip_preserves_order_and_distances() {
        let distances = [3.0, 1.0, 4.0, 1.5, 5.0, 9.0, 2.0, 6.0];
        let mut plain = ListSearcher::exact(&distances);
        let expected = drain(&mut plain);

        let squared = TransformedSearcher::new(ListSearcher::exact(&distances), Square);
        let mut round_trip = TransformedSearcher::new(squared, SquareRoot);
        let actual = drain(&mut round_trip);

        assert_eq!(actual.len(), expected.len());
        for ((id_a, d_a), (id_e, d_e)) in actual.iter().zip(&expected) {
            assert_eq!(id_a, id_e);
            assert!((d_a - d_e).abs() < 1e-12);
        }

        let knn = round_trip.get_knn(&(), 3).unwrap();
        assert_eq!(knn.ids(), vec![ObjectId(1), ObjectId(3), ObjectId(6)]);
    }
}
