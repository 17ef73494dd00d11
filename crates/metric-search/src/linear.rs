//! Linear-scan priority searcher.
//!
//! Used when no index can answer a query. Objects are visited in id order;
//! the exact distance is computed while advancing, so candidates beyond
//! the cutoff are skipped without being reported. There is no ordering
//! guarantee, hence `all_lower_bound()` is always 0.

use metric_types::{Distance, ObjectId, Relation};

use crate::error::SearchError;
use crate::searcher::{LinearScan, PrioritySearcher};

/// Brute-force searcher over a whole relation.
pub struct LinearScanPrioritySearcher<R: Relation, D> {
    relation: R,
    distance: D,
    query: Option<R::Object>,
    next: usize,
    current: Option<(ObjectId, f64)>,
    threshold: f64,
    distance_computations: u64,
}

impl<R, D> LinearScanPrioritySearcher<R, D>
where
    R: Relation,
    D: Distance<R::Object>,
{
    pub fn new(relation: R, distance: D) -> Self {
        Self {
            relation,
            distance,
            query: None,
            next: 0,
            current: None,
            threshold: f64::INFINITY,
            distance_computations: 0,
        }
    }

    /// Distance evaluations performed since construction.
    pub fn distance_computations(&self) -> u64 {
        self.distance_computations
    }

    pub fn relation(&self) -> &R {
        &self.relation
    }
}

impl<R, D> PrioritySearcher for LinearScanPrioritySearcher<R, D>
where
    R: Relation,
    R::Object: Clone,
    D: Distance<R::Object>,
{
    type Query = R::Object;

    fn search(&mut self, query: &R::Object) -> Result<(), SearchError> {
        self.query = Some(query.clone());
        self.threshold = f64::INFINITY;
        self.next = 0;
        self.current = None;
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
    }

    fn cutoff(&self) -> f64 {
        self.threshold
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        self.current = None;
        let Some(query) = self.query.as_ref() else {
            return Ok(());
        };
        while self.next < self.relation.len() {
            let id = ObjectId::from(self.next);
            self.next += 1;
            let Some(object) = self.relation.get(id) else {
                continue;
            };
            let distance = self.distance.distance(query, object);
            self.distance_computations += 1;
            if distance <= self.threshold {
                self.current = Some((id, distance));
                break;
            }
        }
        Ok(())
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.current.map(|(id, _)| id)
    }

    fn compute_exact_distance(&mut self) -> f64 {
        self.current.map_or(f64::NAN, |(_, d)| d)
    }

    fn lower_bound(&self) -> f64 {
        self.current.map_or(f64::NAN, |(_, d)| d)
    }

    fn upper_bound(&self) -> f64 {
        self.current.map_or(f64::NAN, |(_, d)| d)
    }

    fn approximate_distance(&self) -> f64 {
        self.current.map_or(f64::NAN, |(_, d)| d)
    }

    fn approximate_accuracy(&self) -> f64 {
        self.current.map_or(f64::NAN, |_| 0.0)
    }

    fn all_lower_bound(&self) -> f64 {
        0.0
    }

    fn is_linear_scan(&self) -> bool {
        true
    }
}

impl<R: Relation, D> LinearScan for LinearScanPrioritySearcher<R, D> {}
