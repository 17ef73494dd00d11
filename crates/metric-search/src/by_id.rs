//! Identity-lookup adapters.
//!
//! Turn a searcher queried by object value into one queried by the id of an
//! object already stored in a relation.
//!
//! A search for an unknown id fails and leaves the adapter without a
//! session: the previous query's candidates are not reported again.

use metric_types::{ObjectId, Relation};
use tracing::warn;

use crate::error::SearchError;
use crate::searcher::{LinearScan, PrioritySearcher};

/// Resolves query ids through a relation, then forwards to `inner`.
pub struct ByIdSearcher<S, R> {
    inner: S,
    relation: R,
    /// Whether the last `search` found its query id
    active: bool,
}

impl<S, R> ByIdSearcher<S, R>
where
    R: Relation,
    S: PrioritySearcher<Query = R::Object>,
{
    pub fn new(inner: S, relation: R) -> Self {
        Self {
            inner,
            relation,
            active: false,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, R> ByIdSearcher<S, R> {
    /// Read a bound from the inner session, `NaN` without one.
    fn forward(&self, bound: impl Fn(&S) -> f64) -> f64 {
        if self.active {
            bound(&self.inner)
        } else {
            f64::NAN
        }
    }
}

fn lookup<R: Relation>(relation: &R, id: ObjectId) -> Result<&R::Object, SearchError> {
    relation.get(id).ok_or_else(|| {
        warn!(%id, "Query object not in relation");
        SearchError::UnknownObject(id)
    })
}

impl<S, R> PrioritySearcher for ByIdSearcher<S, R>
where
    R: Relation,
    S: PrioritySearcher<Query = R::Object>,
{
    type Query = ObjectId;

    fn search(&mut self, query: &ObjectId) -> Result<(), SearchError> {
        self.active = false;
        let object = lookup(&self.relation, *query)?;
        self.inner.search(object)?;
        self.active = true;
        Ok(())
    }

    fn search_with_cutoff(&mut self, query: &ObjectId, threshold: f64) -> Result<(), SearchError> {
        self.active = false;
        let object = lookup(&self.relation, *query)?;
        self.inner.search_with_cutoff(object, threshold)?;
        self.active = true;
        Ok(())
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        if self.active {
            self.inner.decrease_cutoff(threshold)
        }
    }

    fn cutoff(&self) -> f64 {
        if self.active {
            self.inner.cutoff()
        } else {
            f64::INFINITY
        }
    }

    fn is_valid(&self) -> bool {
        self.active && self.inner.is_valid()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        if self.active {
            self.inner.advance()
        } else {
            Ok(())
        }
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.active.then(|| self.inner.candidate()).flatten()
    }

    fn compute_exact_distance(&mut self) -> f64 {
        if self.active {
            self.inner.compute_exact_distance()
        } else {
            f64::NAN
        }
    }

    fn lower_bound(&self) -> f64 {
        self.forward(|s| s.lower_bound())
    }

    fn upper_bound(&self) -> f64 {
        self.forward(|s| s.upper_bound())
    }

    fn approximate_distance(&self) -> f64 {
        self.forward(|s| s.approximate_distance())
    }

    fn approximate_accuracy(&self) -> f64 {
        self.forward(|s| s.approximate_accuracy())
    }

    fn all_lower_bound(&self) -> f64 {
        self.forward(|s| s.all_lower_bound())
    }

    fn is_linear_scan(&self) -> bool {
        self.inner.is_linear_scan()
    }
}

/// `ByIdSearcher` tagged as a linear scan.
///
/// Behaves exactly like the generic adapter; the tag lets callers see that
/// no index backs the results and pick a different strategy upstream.
pub struct LinearScanByIdSearcher<S, R>(ByIdSearcher<S, R>);

impl<S, R> LinearScanByIdSearcher<S, R>
where
    R: Relation,
    S: PrioritySearcher<Query = R::Object>,
{
    pub fn new(inner: S, relation: R) -> Self {
        Self(ByIdSearcher::new(inner, relation))
    }

    pub fn inner(&self) -> &S {
        self.0.inner()
    }
}

impl<S, R> PrioritySearcher for LinearScanByIdSearcher<S, R>
where
    R: Relation,
    S: PrioritySearcher<Query = R::Object>,
{
    type Query = ObjectId;

    fn search(&mut self, query: &ObjectId) -> Result<(), SearchError> {
        self.0.search(query)
    }

    fn search_with_cutoff(&mut self, query: &ObjectId, threshold: f64) -> Result<(), SearchError> {
        self.0.search_with_cutoff(query, threshold)
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        self.0.decrease_cutoff(threshold)
    }

    fn cutoff(&self) -> f64 {
        self.0.cutoff()
    }

    fn is_valid(&self) -> bool {
        self.0.is_valid()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        self.0.advance()
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.0.candidate()
    }

    fn compute_exact_distance(&mut self) -> f64 {
        self.0.compute_exact_distance()
    }

    fn lower_bound(&self) -> f64 {
        self.0.lower_bound()
    }

    fn upper_bound(&self) -> f64 {
        self.0.upper_bound()
    }

    fn approximate_distance(&self) -> f64 {
        self.0.approximate_distance()
    }

    fn approximate_accuracy(&self) -> f64 {
        self.0.approximate_accuracy()
    }

    fn all_lower_bound(&self) -> f64 {
        self.0.all_lower_bound()
    }

    fn is_linear_scan(&self) -> bool {
        true
    }
}

impl<S, R> LinearScan for LinearScanByIdSearcher<S, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::ExactPrioritySearcher;
    use crate::linear::LinearScanPrioritySearcher;
    use metric_types::{EuclideanDistance, VecRelation};

    fn relation() -> VecRelation<Vec<f64>> {
        VecRelation::new(vec![vec![0.0], vec![3.0], vec![1.0], vec![7.0]])
    }

    #[test]
    fn test_search_by_id_uses_stored_value() {
        let relation = relation();
        let inner = LinearScanPrioritySearcher::new(&relation, EuclideanDistance);
        let mut searcher = ByIdSearcher::new(inner, &relation);

        let knn = searcher.get_knn(&ObjectId(1), 2).unwrap();
        assert_eq!(knn.ids(), vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(knn.distances(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let relation = relation();
        let inner = LinearScanPrioritySearcher::new(&relation, EuclideanDistance);
        let mut searcher = ByIdSearcher::new(inner, &relation);

        let err = searcher.search(&ObjectId(9)).unwrap_err();
        assert!(matches!(err, SearchError::UnknownObject(ObjectId(9))));
        assert!(!searcher.is_valid());
    }

    #[test]
    fn test_unknown_id_discards_previous_session() {
        let relation = relation();
        let inner = LinearScanPrioritySearcher::new(&relation, EuclideanDistance);
        let mut searcher = ByIdSearcher::new(inner, &relation);

        searcher.search(&ObjectId(0)).unwrap();
        searcher.decrease_cutoff(1.0);
        assert!(searcher.is_valid());
        assert_eq!(searcher.candidate(), Some(ObjectId(0)));

        let err = searcher.search_with_cutoff(&ObjectId(99), 5.0).unwrap_err();
        assert!(matches!(err, SearchError::UnknownObject(ObjectId(99))));
        assert!(!searcher.is_valid());
        assert_eq!(searcher.candidate(), None);
        assert_eq!(searcher.cutoff(), f64::INFINITY);
        assert!(searcher.lower_bound().is_nan());
        assert!(searcher.compute_exact_distance().is_nan());
        searcher.advance().unwrap();
        assert!(!searcher.is_valid());

        // A later valid search starts afresh.
        searcher.search(&ObjectId(3)).unwrap();
        assert_eq!(searcher.candidate(), Some(ObjectId(0)));
        assert_eq!(searcher.cutoff(), f64::INFINITY);
    }

    #[test]
    fn test_tagged_adapter_discards_previous_session() {
        let relation = relation();
        let mut searcher =
            LinearScanByIdSearcher::new(LinearScanPrioritySearcher::new(&relation, EuclideanDistance), &relation);

        searcher.search(&ObjectId(2)).unwrap();
        assert!(searcher.is_valid());
        assert!(searcher.search(&ObjectId(4)).is_err());
        assert!(!searcher.is_valid());
        assert_eq!(searcher.candidate(), None);
    }

    #[test]
    fn test_generic_adapter_forwards_linear_flag() {
        let relation = relation();
        let inner = ExactPrioritySearcher::new(LinearScanPrioritySearcher::new(&relation, EuclideanDistance));
        let searcher = ByIdSearcher::new(inner, &relation);
        assert!(searcher.is_linear_scan());
    }

    #[test]
    fn test_linear_scan_variant_matches_generic() {
        let relation = relation();
        let mut generic = ByIdSearcher::new(LinearScanPrioritySearcher::new(&relation, EuclideanDistance), &relation);
        let mut tagged =
            LinearScanByIdSearcher::new(LinearScanPrioritySearcher::new(&relation, EuclideanDistance), &relation);

        assert!(tagged.is_linear_scan());
        let expected = generic.get_range(&ObjectId(0), 3.0).unwrap();
        let actual = tagged.get_range(&ObjectId(0), 3.0).unwrap();
        assert_eq!(actual.ids(), expected.ids());
        assert_eq!(actual.distances(), vec![0.0, 1.0, 3.0]);
        assert_eq!(tagged.inner().distance_computations(), 4);
    }
}
