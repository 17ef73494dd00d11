//! Best-first priority search over an M-tree.
//!
//! A min-heap holds pending subtrees and objects keyed by a lower bound on
//! their distance to the query. Keys are clamped to the key of the node
//! they were expanded from, so they pop in non-decreasing order and the
//! key of the current candidate is a valid `all_lower_bound()`.
//!
//! Objects found in a leaf reached through a routing object are not
//! measured right away: the triangle inequality bounds them by
//! `|d(q, p) - pd|` and `d(q, p) + pd`, and the exact distance is computed
//! only when asked for.
//!
//! Bounds derived from stored distances carry their rounding error, so
//! they are widened by a small slack relative to the operands. A lower
//! bound that lands one ulp above the true distance would let callers
//! trusting `all_lower_bound()` emit candidates out of order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use metric_search::{PrioritySearcher, SearchError};
use metric_storage::PageStore;
use metric_types::{Distance, NodeId, ObjectId, Relation};
use tracing::{trace, warn};

use crate::tree::MTree;

/// Relative slack applied to derived bounds, covering rounding in stored
/// parent distances and covering radii accumulated over the tree height.
const BOUND_SLACK: f64 = 64.0 * f64::EPSILON;

/// Widen a derived lower bound downward by the rounding error of operands
/// of magnitude `scale`.
fn relax_lower(bound: f64, scale: f64) -> f64 {
    bound - scale * BOUND_SLACK
}

/// Widen a derived upper bound upward by its own rounding error.
fn relax_upper(bound: f64) -> f64 {
    bound + bound * BOUND_SLACK
}

#[derive(Debug, Clone, Copy)]
enum Target {
    /// Subtree, with the distance from the query to its routing object
    Node {
        page: NodeId,
        routing_distance: Option<f64>,
    },
    /// Data object with bounds and, once known, its exact distance
    Object {
        id: ObjectId,
        upper: f64,
        exact: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Item {
    key: f64,
    target: Target,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Item {}

impl Ord for Item {
    // Reversed for a min-heap; objects before nodes on equal keys.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| self.is_object().cmp(&other.is_object()))
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Item {
    fn is_object(&self) -> bool {
        matches!(self.target, Target::Object { .. })
    }
}

/// Incremental searcher over the objects indexed by an `MTree`.
pub struct MTreePrioritySearcher<'t, R: Relation, D, S> {
    tree: &'t MTree<R, D, S>,
    query: Option<R::Object>,
    heap: BinaryHeap<Item>,
    threshold: f64,
    current: Option<Item>,
    nodes_read: u64,
}

impl<R, D, S> MTree<R, D, S>
where
    R: Relation,
    R::Object: Clone,
    D: Distance<R::Object>,
    S: PageStore,
{
    /// Best-first searcher over this tree.
    pub fn priority_searcher(&self) -> MTreePrioritySearcher<'_, R, D, S> {
        MTreePrioritySearcher {
            tree: self,
            query: None,
            heap: BinaryHeap::new(),
            threshold: f64::INFINITY,
            current: None,
            nodes_read: 0,
        }
    }
}

impl<R, D, S> MTreePrioritySearcher<'_, R, D, S>
where
    R: Relation,
    R::Object: Clone,
    D: Distance<R::Object>,
    S: PageStore,
{
    /// Pages read since the searcher was created.
    pub fn nodes_read(&self) -> u64 {
        self.nodes_read
    }

    fn push(&mut self, key: f64, target: Target) {
        if key <= self.threshold {
            self.heap.push(Item { key, target });
        }
    }

    /// Read a node and queue its entries, pruned against the cutoff.
    fn expand(
        &mut self,
        page: NodeId,
        parent_key: f64,
        routing_distance: Option<f64>,
    ) -> Result<(), SearchError> {
        let node = self.tree.read_node(page)?;
        self.nodes_read += 1;
        let tree = self.tree;
        let Some(query) = self.query.as_ref() else {
            return Ok(());
        };

        let mut queued = Vec::with_capacity(node.len());
        for entry in node.entries() {
            let radius = entry.covering_radius();
            // Prune by the stored parent distance before measuring.
            if let Some(dp) = routing_distance {
                let pd = entry.parent_distance();
                if relax_lower((dp - pd).abs() - radius, dp + pd + radius) > self.threshold {
                    continue;
                }
            }

            match entry.child() {
                Some(child) => {
                    let Some(object) = tree.relation().get(entry.routing_object()) else {
                        warn!(id = %entry.routing_object(), "Routing object missing from relation");
                        continue;
                    };
                    let d = tree.measure(query, object);
                    let key = relax_lower(d - radius, d + radius)
                        .max(0.0)
                        .max(parent_key);
                    queued.push((
                        key,
                        Target::Node {
                            page: child,
                            routing_distance: Some(d),
                        },
                    ));
                }
                None => match routing_distance {
                    Some(dp) => {
                        let pd = entry.parent_distance();
                        let key = relax_lower((dp - pd).abs(), dp + pd)
                            .max(0.0)
                            .max(parent_key);
                        queued.push((
                            key,
                            Target::Object {
                                id: entry.routing_object(),
                                upper: relax_upper(dp + pd),
                                exact: None,
                            },
                        ));
                    }
                    // Root leaf: no routing object to bound against.
                    None => {
                        let Some(object) = tree.relation().get(entry.routing_object()) else {
                            warn!(id = %entry.routing_object(), "Object missing from relation");
                            continue;
                        };
                        let d = tree.measure(query, object);
                        queued.push((
                            d.max(parent_key),
                            Target::Object {
                                id: entry.routing_object(),
                                upper: d,
                                exact: Some(d),
                            },
                        ));
                    }
                },
            }
        }

        trace!(%page, entries = node.len(), queued = queued.len(), "Expanded node");
        for (key, target) in queued {
            self.push(key, target);
        }
        Ok(())
    }
}

impl<R, D, S> PrioritySearcher for MTreePrioritySearcher<'_, R, D, S>
where
    R: Relation,
    R::Object: Clone,
    D: Distance<R::Object>,
    S: PageStore,
{
    type Query = R::Object;

    fn search(&mut self, query: &R::Object) -> Result<(), SearchError> {
        self.query = Some(query.clone());
        self.heap.clear();
        self.current = None;
        self.threshold = f64::INFINITY;
        self.heap.push(Item {
            key: 0.0,
            target: Target::Node {
                page: self.tree.root(),
                routing_distance: None,
            },
        });
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
        while let Some(item) = self.heap.pop() {
            if item.key > self.threshold {
                // Everything left is at least as far.
                self.heap.clear();
                break;
            }
            match item.target {
                Target::Node {
                    page,
                    routing_distance,
                } => self.expand(page, item.key, routing_distance)?,
                Target::Object { .. } => {
                    self.current = Some(item);
                    break;
                }
            }
        }
        Ok(())
    }

    fn candidate(&self) -> Option<ObjectId> {
        match self.current?.target {
            Target::Object { id, .. } => Some(id),
            Target::Node { .. } => None,
        }
    }

    fn compute_exact_distance(&mut self) -> f64 {
        let Some(Item {
            key,
            target: Target::Object { id, upper, exact },
        }) = self.current
        else {
            return f64::NAN;
        };
        if let Some(d) = exact {
            return d;
        }

        let tree = self.tree;
        let (Some(query), Some(object)) = (self.query.as_ref(), tree.relation().get(id)) else {
            warn!(%id, "Object missing from relation");
            return f64::NAN;
        };
        let d = tree.measure(query, object);
        self.current = Some(Item {
            key,
            target: Target::Object {
                id,
                upper,
                exact: Some(d),
            },
        });
        d
    }

    fn lower_bound(&self) -> f64 {
        match self.current {
            Some(Item {
                target: Target::Object { exact: Some(d), .. },
                ..
            }) => d,
            Some(item) => item.key,
            None => f64::NAN,
        }
    }

    fn upper_bound(&self) -> f64 {
        match self.current {
            Some(Item {
                target: Target::Object { upper, exact, .. },
                ..
            }) => exact.unwrap_or(upper),
            _ => f64::NAN,
        }
    }

    fn approximate_distance(&self) -> f64 {
        (self.lower_bound() + self.upper_bound()) / 2.0
    }

    fn approximate_accuracy(&self) -> f64 {
        (self.upper_bound() - self.lower_bound()) / 2.0
    }

    fn all_lower_bound(&self) -> f64 {
        self.current.map_or(f64::INFINITY, |item| item.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metric_search::ExactPrioritySearcher;
    use metric_types::{EuclideanDistance, ManhattanDistance, TreeSettings, VecRelation};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, seed: u64) -> VecRelation<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| vec![rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)])
            .collect::<Vec<_>>()
            .into()
    }

    fn build<'r>(
        relation: &'r VecRelation<Vec<f64>>,
    ) -> MTree<&'r VecRelation<Vec<f64>>, EuclideanDistance, metric_storage::CachedPageStore<metric_storage::MemoryPageStore>>
    {
        let settings = TreeSettings::default().with_capacity(5, 4);
        let mut tree = MTree::in_memory(relation, EuclideanDistance, settings).unwrap();
        tree.insert_all(relation.ids()).unwrap();
        tree
    }

    fn brute_force(relation: &VecRelation<Vec<f64>>, query: &Vec<f64>) -> Vec<f64> {
        let mut d: Vec<f64> = relation
            .objects()
            .iter()
            .map(|o| EuclideanDistance.distance(query, o))
            .collect();
        d.sort_by(f64::total_cmp);
        d
    }

    #[test]
    fn test_visits_every_object_once() {
        let relation = random_points(80, 1);
        let tree = build(&relation);
        let mut searcher = tree.priority_searcher();
        searcher.search(&vec![50.0, 50.0]).unwrap();

        let mut seen = Vec::new();
        while searcher.is_valid() {
            seen.push(searcher.candidate().unwrap());
            searcher.advance().unwrap();
        }
        seen.sort();
        assert_eq!(seen, relation.ids().collect::<Vec<_>>());
    }

    #[test]
    fn test_bounds_and_monotone_all_lower_bound() {
        let relation = random_points(120, 2);
        let tree = build(&relation);
        let mut searcher = tree.priority_searcher();
        searcher.search(&vec![10.0, 90.0]).unwrap();

        let mut previous = 0.0;
        while searcher.is_valid() {
            let all_lower = searcher.all_lower_bound();
            assert!(all_lower >= previous);
            previous = all_lower;

            let (lower, upper) = (searcher.lower_bound(), searcher.upper_bound());
            let (approx, accuracy) = (searcher.approximate_distance(), searcher.approximate_accuracy());
            let exact = searcher.compute_exact_distance();
            assert!(lower <= exact + 1e-9, "{} > {}", lower, exact);
            assert!(exact <= upper + 1e-9, "{} > {}", exact, upper);
            assert!(approx - accuracy <= exact + 1e-9);
            assert!(exact <= approx + accuracy + 1e-9);
            assert!(all_lower <= exact + 1e-9);
            // Cached: bounds collapse once the exact distance is known.
            assert_eq!(searcher.lower_bound(), exact);
            assert_eq!(searcher.upper_bound(), exact);
            searcher.advance().unwrap();
        }
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let relation = random_points(200, 3);
        let tree = build(&relation);
        let mut rng = StdRng::seed_from_u64(33);
        for _ in 0..20 {
            let query = vec![rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)];
            let expected = brute_force(&relation, &query);
            for k in [1, 5, 17] {
                let knn = tree.priority_searcher().get_knn(&query, k).unwrap();
                assert_eq!(knn.distances(), expected[..k].to_vec());
            }
        }
    }

    #[test]
    fn test_range_matches_brute_force() {
        let relation = random_points(200, 4);
        let tree = build(&relation);
        let query = vec![40.0, 60.0];
        let expected: Vec<f64> = brute_force(&relation, &query)
            .into_iter()
            .filter(|&d| d <= 15.0)
            .collect();
        let range = tree.priority_searcher().get_range(&query, 15.0).unwrap();
        assert_eq!(range.distances(), expected);
    }

    #[test]
    fn test_knn_prunes_distance_computations() {
        let relation = random_points(400, 5);
        let tree = build(&relation);
        let before = tree.stats().distance_computations;
        tree.priority_searcher().get_knn(&vec![1.0, 1.0], 3).unwrap();
        let used = tree.stats().distance_computations - before;
        assert!(used < 400, "kNN used {} distance computations", used);
    }

    #[test]
    fn test_exact_decorator_orders_tree_results() {
        let relation = random_points(150, 6);
        let tree = build(&relation);
        let query = vec![70.0, 20.0];
        let mut exact = ExactPrioritySearcher::new(tree.priority_searcher());
        exact.search(&query).unwrap();

        let mut seen = Vec::new();
        while exact.is_valid() {
            seen.push(exact.compute_exact_distance());
            exact.advance().unwrap();
        }
        assert_eq!(seen, brute_force(&relation, &query));
    }

    #[test]
    fn test_exact_order_on_integer_grid_manhattan() {
        // Grid points make ties and boundary-equal bounds common.
        let mut rng = StdRng::seed_from_u64(81);
        for round in 0..120 {
            let n: usize = rng.random_range(10..50);
            let points: Vec<Vec<f64>> = (0..n)
                .map(|_| (0..3).map(|_| rng.random_range(0..6i32) as f64).collect())
                .collect();
            let relation = VecRelation::new(points);
            let capacity: usize = rng.random_range(2..=5);
            let settings = TreeSettings::default().with_capacity(capacity, capacity);
            let mut tree = MTree::in_memory(&relation, ManhattanDistance, settings).unwrap();
            tree.insert_all(relation.ids()).unwrap();
            let query: Vec<f64> = (0..3).map(|_| rng.random_range(0.0..5.0)).collect();

            let mut exact = ExactPrioritySearcher::new(tree.priority_searcher());
            exact.search(&query).unwrap();
            let mut previous = f64::NEG_INFINITY;
            let mut emitted = 0;
            while exact.is_valid() {
                let d = exact.compute_exact_distance();
                assert!(d >= previous, "round {round}: {d} emitted after {previous}");
                assert!(exact.all_lower_bound() >= previous);
                previous = d;
                emitted += 1;
                exact.advance().unwrap();
            }
            assert_eq!(emitted, n);

            let mut searcher = tree.priority_searcher();
            searcher.search(&query).unwrap();
            while searcher.is_valid() {
                let (lower, upper) = (searcher.lower_bound(), searcher.upper_bound());
                let all_lower = searcher.all_lower_bound();
                let d = searcher.compute_exact_distance();
                assert!(lower <= d, "round {round}: lower {lower} > {d}");
                assert!(d <= upper, "round {round}: {d} > upper {upper}");
                assert!(all_lower <= d);
                searcher.advance().unwrap();
            }
        }
    }

    #[test]
    fn test_empty_tree_search() {
        let relation = random_points(0, 7);
        let tree = build(&relation);
        let mut searcher = tree.priority_searcher();
        searcher.search(&vec![0.0, 0.0]).unwrap();
        assert!(!searcher.is_valid());
        assert!(searcher.get_knn(&vec![0.0, 0.0], 4).unwrap().is_empty());
        assert!(searcher.lower_bound().is_nan());
    }

    #[test]
    fn test_cutoff_stops_search() {
        let relation = random_points(100, 8);
        let tree = build(&relation);
        let mut searcher = tree.priority_searcher();
        searcher.search(&vec![50.0, 50.0]).unwrap();
        searcher.decrease_cutoff(0.0);
        searcher.advance().unwrap();
        while searcher.is_valid() {
            assert!(searcher.lower_bound() <= 0.0);
            searcher.advance().unwrap();
        }
        assert_eq!(searcher.cutoff(), 0.0);
    }

    #[test]
    fn test_manhattan_knn() {
        let relation = random_points(90, 9);
        let settings = TreeSettings::default().with_capacity(3, 3);
        let mut tree = MTree::in_memory(&relation, ManhattanDistance, settings).unwrap();
        tree.insert_all(relation.ids()).unwrap();

        let query = vec![25.0, 75.0];
        let mut expected: Vec<f64> = relation
            .objects()
            .iter()
            .map(|o| ManhattanDistance.distance(&query, o))
            .collect();
        expected.sort_by(f64::total_cmp);
        let knn = tree.priority_searcher().get_knn(&query, 10).unwrap();
        assert_eq!(knn.distances(), expected[..10].to_vec());
    }
}
