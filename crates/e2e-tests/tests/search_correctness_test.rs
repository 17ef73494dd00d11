//! E2E tests: kNN and range answers of every searcher agree with brute force.

use pretty_assertions::assert_eq;

use e2e_tests::{brute_force_knn, brute_force_range, small_settings, TestHarness};
use metric_search::{ExactPrioritySearcher, LinearScanPrioritySearcher, PrioritySearcher};
use metric_tree::QueryBuilder;
use metric_types::{EuclideanDistance, ManhattanDistance, SplitStrategyKind};

const STRATEGIES: [SplitStrategyKind; 2] = [SplitStrategyKind::FarthestPair, SplitStrategyKind::Random];

#[test]
fn test_knn_matches_brute_force_on_small_relation() {
    let harness = TestHarness::from_points(vec![
        vec![3.0],
        vec![1.0],
        vec![4.0],
        vec![1.0],
        vec![5.0],
    ]);
    let tree = harness.tree(EuclideanDistance, small_settings());

    let knn = tree.priority_searcher().get_knn(&vec![1.0], 2).unwrap();
    assert_eq!(knn.distances(), vec![0.0, 0.0]);

    let knn = tree.priority_searcher().get_knn(&vec![0.0], 5).unwrap();
    assert_eq!(knn.distances(), vec![1.0, 1.0, 3.0, 4.0, 5.0]);
}

#[test]
fn test_knn_every_k_on_random_relations() {
    for (round, seed) in (0..8u64).enumerate() {
        let strategy = STRATEGIES[round % STRATEGIES.len()];
        let n = 10 + (seed as usize * 5);
        let mut harness = TestHarness::new(n, 3, seed);
        let queries = harness.random_queries(4);
        let settings = small_settings()
            .with_split(strategy, seed)
            .with_integrity_checks(true);
        let tree = harness.tree(EuclideanDistance, settings);
        assert_eq!(tree.len(), n);

        for query in &queries {
            for k in 1..=n {
                let expected = brute_force_knn(&harness.relation, &EuclideanDistance, query, k);

                let tree_knn = tree.priority_searcher().get_knn(query, k).unwrap();
                assert_eq!(tree_knn.distances(), expected, "tree, n={n} k={k}");

                let mut exact = ExactPrioritySearcher::new(tree.priority_searcher());
                let exact_knn = exact.get_knn(query, k).unwrap();
                assert_eq!(exact_knn.distances(), expected, "exact, n={n} k={k}");

                let mut scan = LinearScanPrioritySearcher::new(&harness.relation, EuclideanDistance);
                assert_eq!(scan.get_knn(query, k).unwrap().distances(), expected, "scan, n={n} k={k}");
            }
        }
    }
}

#[test]
fn test_knn_larger_k_returns_everything() {
    let mut harness = TestHarness::new(12, 2, 7);
    let query = harness.random_query();
    let tree = harness.tree(EuclideanDistance, small_settings());

    let knn = tree.priority_searcher().get_knn(&query, 50).unwrap();
    assert_eq!(knn.len(), 12);
    assert_eq!(
        knn.distances(),
        brute_force_knn(&harness.relation, &EuclideanDistance, &query, 12)
    );
}

#[test]
fn test_range_matches_brute_force() {
    for seed in 0..6u64 {
        let mut harness = TestHarness::new(50, 2, 100 + seed);
        let queries = harness.random_queries(5);
        let settings = small_settings().with_split(STRATEGIES[(seed % 2) as usize], seed);
        let tree = harness.tree(EuclideanDistance, settings);

        for (query, radius) in queries.iter().zip([0.0, 5.0, 20.0, 45.0, 200.0]) {
            let expected = brute_force_range(&harness.relation, &EuclideanDistance, query, radius);

            let found = tree.priority_searcher().get_range(query, radius).unwrap();
            assert_eq!(found.distances(), expected, "tree, radius={radius}");

            let mut exact = ExactPrioritySearcher::new(tree.priority_searcher());
            let found = exact.get_range(query, radius).unwrap();
            assert_eq!(found.distances(), expected, "exact, radius={radius}");
        }
    }
}

#[test]
fn test_range_includes_objects_on_the_boundary() {
    let harness = TestHarness::from_points((0..20).map(|i| vec![i as f64]).collect());
    let tree = harness.tree(EuclideanDistance, small_settings());

    let found = tree.priority_searcher().get_range(&vec![10.0], 2.0).unwrap();
    assert_eq!(found.distances(), vec![0.0, 1.0, 1.0, 2.0, 2.0]);
}

#[test]
fn test_manhattan_tree_matches_brute_force() {
    let mut harness = TestHarness::new(40, 4, 31);
    let queries = harness.random_queries(4);
    let tree = harness.tree(ManhattanDistance, small_settings().with_integrity_checks(true));

    for (query, k) in queries.iter().zip([1, 3, 10, 40]) {
        let expected = brute_force_knn(&harness.relation, &ManhattanDistance, query, k);
        assert_eq!(tree.priority_searcher().get_knn(query, k).unwrap().distances(), expected);
    }
}

#[test]
fn test_query_builder_paths_agree() {
    let mut harness = TestHarness::new(45, 3, 77);
    let query = harness.random_query();
    let tree = harness.tree(EuclideanDistance, small_settings());
    let expected = brute_force_knn(&harness.relation, &EuclideanDistance, &query, 7);

    let indexed = QueryBuilder::new(&harness.relation, EuclideanDistance).with_index(&tree);
    let mut searcher = indexed.priority_by_object();
    assert!(!searcher.is_linear_scan());
    assert_eq!(searcher.get_knn(&query, 7).unwrap().distances(), expected);

    let mut exact = indexed.exact(true).priority_by_object();
    assert_eq!(exact.get_knn(&query, 7).unwrap().distances(), expected);

    let scanned = QueryBuilder::new(&harness.relation, EuclideanDistance)
        .with_index(&tree)
        .with_linear_scan_threshold(1000);
    let mut scan = scanned.priority_by_object();
    assert!(scan.is_linear_scan());
    assert_eq!(scan.get_knn(&query, 7).unwrap().distances(), expected);

    // Manhattan queries cannot use a Euclidean index.
    let manhattan = QueryBuilder::new(&harness.relation, ManhattanDistance).with_index(&tree);
    let mut fallback = manhattan.priority_by_object();
    assert!(fallback.is_linear_scan());
    assert_eq!(
        fallback.get_knn(&query, 7).unwrap().distances(),
        brute_force_knn(&harness.relation, &ManhattanDistance, &query, 7)
    );
}

#[test]
fn test_searcher_is_reusable_across_queries() {
    let mut harness = TestHarness::new(30, 2, 5);
    let queries = harness.random_queries(3);
    let tree = harness.tree(EuclideanDistance, small_settings());
    let mut searcher = tree.priority_searcher();

    for (query, k) in queries.iter().zip([3, 1, 8]) {
        let expected = brute_force_knn(&harness.relation, &EuclideanDistance, query, k);
        assert_eq!(searcher.get_knn(query, k).unwrap().distances(), expected);
    }
}
