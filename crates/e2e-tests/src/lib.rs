//! End-to-end test infrastructure for the metric tree.
//!
//! Provides a shared TestHarness with seeded random data sets, brute-force
//! reference answers and helpers for driving priority searchers by hand.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use metric_search::PrioritySearcher;
use metric_storage::{CachedPageStore, MemoryPageStore, PageStore, StorageError};
use metric_tree::MTree;
use metric_types::{Distance, Node, NodeId, ObjectId, Relation, TreeSettings, VecRelation};

/// Tree over a harness relation, on the default in-memory store.
pub type TestTree<'r, D> = MTree<&'r VecRelation<Vec<f64>>, D, CachedPageStore<MemoryPageStore>>;

/// Install a test subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Shared test harness for E2E tests.
///
/// Holds a seeded random relation of points in `[0, 100)^dim`.
pub struct TestHarness {
    pub relation: VecRelation<Vec<f64>>,
    pub dim: usize,
    rng: StdRng,
}

impl TestHarness {
    /// Create a harness with `n` random points of dimension `dim`.
    pub fn new(n: usize, dim: usize, seed: u64) -> Self {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(seed);
        let points: Vec<Vec<f64>> = (0..n).map(|_| random_point(&mut rng, dim)).collect();
        Self {
            relation: points.into(),
            dim,
            rng,
        }
    }

    /// Create a harness over fixed points.
    pub fn from_points(points: Vec<Vec<f64>>) -> Self {
        init_tracing();
        let dim = points.first().map_or(0, Vec::len);
        Self {
            relation: points.into(),
            dim,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Build a tree over every object of the relation.
    pub fn tree<D>(&self, distance: D, settings: TreeSettings) -> TestTree<'_, D>
    where
        D: Distance<Vec<f64>>,
    {
        let mut tree = MTree::in_memory(&self.relation, distance, settings)
            .expect("Failed to create tree");
        tree.insert_all(self.relation.ids())
            .expect("Failed to insert relation");
        tree
    }

    /// Draw a random query point from the same distribution as the data.
    ///
    /// Draw queries before building a tree: the tree borrows the harness.
    pub fn random_query(&mut self) -> Vec<f64> {
        random_point(&mut self.rng, self.dim)
    }

    pub fn random_queries(&mut self, count: usize) -> Vec<Vec<f64>> {
        (0..count).map(|_| self.random_query()).collect()
    }

    pub fn len(&self) -> usize {
        self.relation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relation.is_empty()
    }
}

fn random_point(rng: &mut StdRng, dim: usize) -> Vec<f64> {
    (0..dim).map(|_| rng.random_range(0.0..100.0)).collect()
}

/// Small capacities so that even tiny relations build several levels.
pub fn small_settings() -> TreeSettings {
    TreeSettings::default()
        .with_capacity(4, 3)
        .with_linear_scan_threshold(0)
}

/// All objects with their distance to `query`, sorted by distance then id.
pub fn brute_force<D>(relation: &VecRelation<Vec<f64>>, distance: &D, query: &[f64]) -> Vec<(ObjectId, f64)>
where
    D: Distance<[f64]>,
{
    let mut all: Vec<(ObjectId, f64)> = relation
        .ids()
        .filter_map(|id| relation.get(id).map(|o| (id, distance.distance(query, o))))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    all
}

/// Distances of the `k` nearest objects.
pub fn brute_force_knn<D>(relation: &VecRelation<Vec<f64>>, distance: &D, query: &[f64], k: usize) -> Vec<f64>
where
    D: Distance<[f64]>,
{
    brute_force(relation, distance, query)
        .into_iter()
        .take(k)
        .map(|(_, d)| d)
        .collect()
}

/// Distances of all objects within `radius`.
pub fn brute_force_range<D>(relation: &VecRelation<Vec<f64>>, distance: &D, query: &[f64], radius: f64) -> Vec<f64>
where
    D: Distance<[f64]>,
{
    brute_force(relation, distance, query)
        .into_iter()
        .map(|(_, d)| d)
        .filter(|&d| d <= radius)
        .collect()
}

/// Everything a searcher reported about one candidate.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: ObjectId,
    pub lower: f64,
    pub upper: f64,
    pub approx: f64,
    pub accuracy: f64,
    pub all_lower: f64,
    pub exact: f64,
}

/// Run a full search session, recording every candidate in emission order.
///
/// Bounds are read before the exact distance is computed.
pub fn drain<S>(searcher: &mut S, query: &S::Query) -> Vec<Candidate>
where
    S: PrioritySearcher + ?Sized,
{
    let mut out = Vec::new();
    searcher.search(query).expect("search failed");
    while searcher.is_valid() {
        let id = searcher.candidate().expect("valid searcher without candidate");
        let lower = searcher.lower_bound();
        let upper = searcher.upper_bound();
        let approx = searcher.approximate_distance();
        let accuracy = searcher.approximate_accuracy();
        let all_lower = searcher.all_lower_bound();
        let exact = searcher.compute_exact_distance();
        out.push(Candidate {
            id,
            lower,
            upper,
            approx,
            accuracy,
            all_lower,
            exact,
        });
        searcher.advance().expect("advance failed");
    }
    out
}

/// Write settings to a temporary TOML file for `TreeSettings::load`.
pub fn settings_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create settings file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write settings file");
    file
}

/// Page store that can be switched into failing reads or writes.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryPageStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl PageStore for FailingStore {
    fn read_node(&self, id: NodeId) -> Result<Node, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected read failure on {id}")));
        }
        self.inner.read_node(id)
    }

    fn write_node(&self, node: &mut Node) -> Result<NodeId, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected write failure".to_string()));
        }
        self.inner.write_node(node)
    }

    fn page_count(&self) -> usize {
        self.inner.page_count()
    }
}
