//! Scripted searchers for unit tests.

use metric_types::ObjectId;

use crate::error::SearchError;
use crate::searcher::PrioritySearcher;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Item {
    pub id: ObjectId,
    pub lower: f64,
    pub upper: f64,
    pub exact: f64,
}

/// Replays a fixed candidate list, ids assigned by input position.
///
/// In ordered mode candidates come sorted by lower bound and
/// `all_lower_bound` is the current lower bound. In unordered mode the
/// input order is kept, bounds are unknown and `all_lower_bound` is 0.
pub(crate) struct ListSearcher {
    items: Vec<Item>,
    ordered: bool,
    position: Option<usize>,
    next: usize,
    threshold: f64,
    exact_computations: usize,
}

impl ListSearcher {
    fn new(mut items: Vec<Item>, ordered: bool) -> Self {
        if ordered {
            items.sort_by(|a, b| a.lower.total_cmp(&b.lower));
        }
        Self {
            items,
            ordered,
            position: None,
            next: 0,
            threshold: f64::INFINITY,
            exact_computations: 0,
        }
    }

    /// Candidates with exactly known distances, sorted.
    pub fn exact(distances: &[f64]) -> Self {
        let items = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| Item {
                id: ObjectId::from(i),
                lower: d,
                upper: d,
                exact: d,
            })
            .collect();
        Self::new(items, true)
    }

    /// Candidates given as `(lower, exact)`, upper mirrored around exact.
    pub fn bounded(pairs: &[(f64, f64)]) -> Self {
        let items = pairs
            .iter()
            .enumerate()
            .map(|(i, &(lower, exact))| Item {
                id: ObjectId::from(i),
                lower,
                upper: exact + (exact - lower),
                exact,
            })
            .collect();
        Self::new(items, true)
    }

    /// Candidates in input order with no bounds.
    pub fn unordered(distances: &[f64]) -> Self {
        let items = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| Item {
                id: ObjectId::from(i),
                lower: f64::NAN,
                upper: f64::NAN,
                exact: d,
            })
            .collect();
        Self::new(items, false)
    }

    pub fn exact_computations(&self) -> usize {
        self.exact_computations
    }

    fn current(&self) -> Option<&Item> {
        self.position.map(|p| &self.items[p])
    }
}

impl PrioritySearcher for ListSearcher {
    type Query = ();

    fn search(&mut self, _query: &()) -> Result<(), SearchError> {
        self.threshold = f64::INFINITY;
        self.next = 0;
        self.position = None;
        self.advance()
    }

    fn decrease_cutoff(&mut self, threshold: f64) {
        debug_assert!(threshold <= self.threshold);
        self.threshold = threshold;
    }

    fn cutoff(&self) -> f64 {
        self.threshold
    }

    fn is_valid(&self) -> bool {
        self.position.is_some()
    }

    fn advance(&mut self) -> Result<(), SearchError> {
        self.position = None;
        while self.next < self.items.len() {
            let index = self.next;
            self.next += 1;
            if self.items[index].lower > self.threshold {
                if self.ordered {
                    self.next = self.items.len();
                }
                continue;
            }
            self.position = Some(index);
            break;
        }
        Ok(())
    }

    fn candidate(&self) -> Option<ObjectId> {
        self.current().map(|i| i.id)
    }

    fn compute_exact_distance(&mut self) -> f64 {
        self.exact_computations += 1;
        self.current().map_or(f64::NAN, |i| i.exact)
    }

    fn lower_bound(&self) -> f64 {
        self.current().map_or(f64::NAN, |i| i.lower)
    }

    fn upper_bound(&self) -> f64 {
        self.current().map_or(f64::NAN, |i| i.upper)
    }

    fn all_lower_bound(&self) -> f64 {
        if !self.ordered {
            return 0.0;
        }
        self.current().map_or(f64::INFINITY, |i| i.lower)
    }
}
