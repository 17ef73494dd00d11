//! Node split strategies.
//!
//! A strategy picks two routing objects among the entries of an overflowing
//! node; the shared `balanced_partition` then distributes the remaining
//! entries between them.

mod assignment;
mod distance_matrix;
mod partition;

pub use assignment::{Assignment, DistanceEntry};
pub use distance_matrix::DistanceMatrix;
pub use partition::{balanced_partition, LiveDistances, PivotDistances};

use metric_types::{Entry, ObjectId, SplitSettings, SplitStrategyKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Policy for choosing the two routing objects of a split.
pub trait SplitStrategy: Send {
    /// Split `entries` into two balanced groups.
    ///
    /// `distance` evaluates the distance between two routing objects.
    fn split(
        &mut self,
        entries: &[Entry],
        is_leaf: bool,
        distance: &dyn Fn(ObjectId, ObjectId) -> f64,
    ) -> Assignment;

    fn name(&self) -> &'static str;
}

/// Promote the two entries farthest apart (MLB_DIST).
///
/// Ties go to the first pair found in `(i, j)` order, so the result is
/// deterministic for a given entry order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FarthestPairSplit;

impl FarthestPairSplit {
    /// Positions of the farthest pair in the matrix.
    pub fn select(matrix: &DistanceMatrix) -> (usize, usize) {
        let mut best = (0, 1);
        let mut max = f64::NEG_INFINITY;
        for i in 0..matrix.len() {
            for j in (i + 1)..matrix.len() {
                let d = matrix.get(i, j);
                if d > max {
                    max = d;
                    best = (i, j);
                }
            }
        }
        best
    }
}

impl SplitStrategy for FarthestPairSplit {
    fn split(
        &mut self,
        entries: &[Entry],
        is_leaf: bool,
        distance: &dyn Fn(ObjectId, ObjectId) -> f64,
    ) -> Assignment {
        let matrix = DistanceMatrix::compute(entries, distance);
        let (p1, p2) = Self::select(&matrix);
        debug!(entries = entries.len(), p1, p2, distance = matrix.get(p1, p2), "Farthest pair selected");
        balanced_partition(entries, is_leaf, p1, p2, &matrix)
    }

    fn name(&self) -> &'static str {
        "farthest_pair"
    }
}

/// Promote two distinct entries drawn uniformly at random.
///
/// Only the distances from the remaining entries to the two pivots are
/// computed, no full matrix.
#[derive(Debug, Clone)]
pub struct RandomSplit {
    rng: StdRng,
}

impl RandomSplit {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw two distinct positions in `0..n`.
    pub fn select(&mut self, n: usize) -> (usize, usize) {
        assert!(n >= 2, "need at least two entries to pick pivots");
        let p1 = self.rng.random_range(0..n);
        let mut p2 = self.rng.random_range(0..n - 1);
        if p2 >= p1 {
            p2 += 1;
        }
        (p1, p2)
    }
}

impl SplitStrategy for RandomSplit {
    fn split(
        &mut self,
        entries: &[Entry],
        is_leaf: bool,
        distance: &dyn Fn(ObjectId, ObjectId) -> f64,
    ) -> Assignment {
        let (p1, p2) = self.select(entries.len());
        debug!(entries = entries.len(), p1, p2, "Random pivots selected");
        let live = LiveDistances::new(entries, distance);
        balanced_partition(entries, is_leaf, p1, p2, &live)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Build the strategy named by the settings.
pub fn strategy_from_settings(settings: &SplitSettings) -> Box<dyn SplitStrategy> {
    match settings.strategy {
        SplitStrategyKind::FarthestPair => Box::new(FarthestPairSplit),
        SplitStrategyKind::Random => Box::new(RandomSplit::new(settings.seed)),
    }
}
