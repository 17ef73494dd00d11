//! Choosing a searcher for a query.
//!
//! `QueryBuilder` looks at the relation, the distance the caller declared and
//! the available index, and hands out the best priority searcher it can: the
//! index itself, the index seen through a distance transform, or a linear
//! scan.

use metric_search::{
    ByIdSearcher, ExactPrioritySearcher, LinearScanByIdSearcher, LinearScanPrioritySearcher,
    PrioritySearcher, Square, SquareRoot, TransformedSearcher,
};
use metric_storage::PageStore;
use metric_types::{Distance, DistanceKind, ObjectId, Relation, TreeSettings};
use tracing::debug;

use crate::tree::MTree;

/// Boxed searcher queried by object value.
pub type ObjectSearcher<'a, O> = Box<dyn PrioritySearcher<Query = O> + 'a>;

/// Boxed searcher queried by object id.
pub type IdSearcher<'a> = Box<dyn PrioritySearcher<Query = ObjectId> + 'a>;

/// An index able to answer priority searches over objects of type `O`.
pub trait PriorityIndex<O> {
    /// Distance the index was built with.
    fn distance_kind(&self) -> DistanceKind;

    /// Relations smaller than this are better served by a linear scan.
    fn linear_scan_threshold(&self) -> usize;

    fn priority_searcher_boxed(&self) -> ObjectSearcher<'_, O>;
}

impl<R, D, S> PriorityIndex<R::Object> for MTree<R, D, S>
where
    R: Relation,
    R::Object: Clone,
    D: Distance<R::Object>,
    S: PageStore,
{
    fn distance_kind(&self) -> DistanceKind {
        self.distance().kind()
    }

    fn linear_scan_threshold(&self) -> usize {
        self.settings().linear_scan_threshold
    }

    fn priority_searcher_boxed(&self) -> ObjectSearcher<'_, R::Object> {
        Box::new(self.priority_searcher())
    }
}

/// How an index answers a query declared with another distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexPlan {
    Direct,
    Square,
    SquareRoot,
}

fn plan(index: DistanceKind, query: DistanceKind) -> Option<IndexPlan> {
    match (index, query) {
        (a, b) if a == b => Some(IndexPlan::Direct),
        (DistanceKind::Euclidean, DistanceKind::SquaredEuclidean) => Some(IndexPlan::Square),
        (DistanceKind::SquaredEuclidean, DistanceKind::Euclidean) => Some(IndexPlan::SquareRoot),
        _ => None,
    }
}

/// Picks a priority searcher for a relation and a query distance.
pub struct QueryBuilder<'a, R: Relation, D> {
    relation: &'a R,
    distance: D,
    index: Option<&'a dyn PriorityIndex<R::Object>>,
    linear_scan_threshold: usize,
    exact: bool,
}

impl<'a, R, D> QueryBuilder<'a, R, D>
where
    R: Relation,
    R::Object: Clone + 'a,
    D: Distance<R::Object> + Clone + 'a,
{
    pub fn new(relation: &'a R, distance: D) -> Self {
        Self {
            relation,
            distance,
            index: None,
            linear_scan_threshold: TreeSettings::default().linear_scan_threshold,
            exact: false,
        }
    }

    /// Use `index` when it can answer the query, adopting its linear-scan
    /// threshold.
    pub fn with_index(mut self, index: &'a dyn PriorityIndex<R::Object>) -> Self {
        self.linear_scan_threshold = index.linear_scan_threshold();
        self.index = Some(index);
        self
    }

    pub fn with_linear_scan_threshold(mut self, threshold: usize) -> Self {
        self.linear_scan_threshold = threshold;
        self
    }

    /// Emit candidates in ascending exact distance.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Index searcher in the caller's distance space, if the index applies.
    fn index_searcher(&self) -> Option<ObjectSearcher<'a, R::Object>> {
        let index = self.index?;
        if self.relation.len() < self.linear_scan_threshold {
            debug!(
                objects = self.relation.len(),
                threshold = self.linear_scan_threshold,
                "Relation below linear scan threshold"
            );
            return None;
        }

        let wanted = self.distance.kind();
        let Some(plan) = plan(index.distance_kind(), wanted) else {
            debug!(index = ?index.distance_kind(), query = ?wanted, "Index distance does not match query");
            return None;
        };
        let searcher = index.priority_searcher_boxed();
        let searcher: ObjectSearcher<'a, R::Object> = match plan {
            IndexPlan::Direct => searcher,
            IndexPlan::Square => Box::new(TransformedSearcher::new(searcher, Square)),
            IndexPlan::SquareRoot => Box::new(TransformedSearcher::new(searcher, SquareRoot)),
        };
        Some(searcher)
    }

    fn linear_scan(&self) -> LinearScanPrioritySearcher<&'a R, D> {
        debug!(
            objects = self.relation.len(),
            distance = ?self.distance.kind(),
            "Falling back to linear scan"
        );
        LinearScanPrioritySearcher::new(self.relation, self.distance.clone())
    }

    fn finish<S>(&self, searcher: S) -> ObjectSearcher<'a, R::Object>
    where
        S: PrioritySearcher<Query = R::Object> + 'a,
    {
        if self.exact {
            Box::new(ExactPrioritySearcher::new(searcher))
        } else {
            Box::new(searcher)
        }
    }

    /// Searcher queried by object value.
    pub fn priority_by_object(&self) -> ObjectSearcher<'a, R::Object> {
        match self.index_searcher() {
            Some(searcher) => self.finish(searcher),
            None => {
                let scan = self.linear_scan();
                self.finish(scan)
            }
        }
    }

    /// Searcher queried by the id of an object in the relation.
    pub fn priority_by_id(&self) -> IdSearcher<'a> {
        match self.index_searcher() {
            Some(searcher) => Box::new(ByIdSearcher::new(self.finish(searcher), self.relation)),
            None => {
                let scan = self.linear_scan();
                Box::new(LinearScanByIdSearcher::new(self.finish(scan), self.relation))
            }
        }
    }
}
