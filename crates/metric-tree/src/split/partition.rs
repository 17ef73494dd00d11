//! Balanced partition of a node's entries around two pivots.

use metric_types::{Entry, ObjectId};

use super::assignment::{Assignment, DistanceEntry};
use super::distance_matrix::DistanceMatrix;

/// Source of distances between entry positions of the node being split.
pub trait PivotDistances {
    fn between(&self, i: usize, j: usize) -> f64;
}

impl PivotDistances for DistanceMatrix {
    fn between(&self, i: usize, j: usize) -> f64 {
        self.get(i, j)
    }
}

/// Distances computed on demand from the entries' routing objects.
pub struct LiveDistances<'a> {
    entries: &'a [Entry],
    distance: &'a dyn Fn(ObjectId, ObjectId) -> f64,
}

impl<'a> LiveDistances<'a> {
    pub fn new(entries: &'a [Entry], distance: &'a dyn Fn(ObjectId, ObjectId) -> f64) -> Self {
        Self { entries, distance }
    }
}

impl PivotDistances for LiveDistances<'_> {
    fn between(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        (self.distance)(
            self.entries[i].routing_object(),
            self.entries[j].routing_object(),
        )
    }
}

/// Split `entries` into two groups around the pivots at `p1` and `p2`.
///
/// The remaining entries are ranked by distance to each pivot (stable, so
/// ties keep input order). Pivot 1 then takes its nearest unassigned entry,
/// pivot 2 takes its nearest unassigned entry, and so on until all entries
/// are committed. Group sizes therefore differ by at most one.
///
/// # Panics
/// Panics if fewer than three entries are given, or if the pivots are equal
/// or out of range.
pub fn balanced_partition<P: PivotDistances + ?Sized>(
    entries: &[Entry],
    is_leaf: bool,
    p1: usize,
    p2: usize,
    distances: &P,
) -> Assignment {
    let n = entries.len();
    assert!(n >= 3, "cannot split a node with {} entries", n);
    assert!(p1 < n && p2 < n, "pivot out of range: ({}, {}) for {} entries", p1, p2, n);
    assert_ne!(p1, p2, "pivots must be distinct");

    let mut by_first = Vec::with_capacity(n - 2);
    let mut by_second = Vec::with_capacity(n - 2);
    for (i, entry) in entries.iter().enumerate() {
        if i == p1 || i == p2 {
            continue;
        }
        by_first.push(DistanceEntry::new(entry.clone(), distances.between(p1, i), i));
        by_second.push(DistanceEntry::new(entry.clone(), distances.between(p2, i), i));
    }
    by_first.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    by_second.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut first = Vec::with_capacity(n / 2 + 1);
    let mut second = Vec::with_capacity(n / 2 + 1);
    first.push(DistanceEntry::new(entries[p1].clone(), 0.0, p1));
    second.push(DistanceEntry::new(entries[p2].clone(), 0.0, p2));

    let mut assigned = vec![false; n];
    assigned[p1] = true;
    assigned[p2] = true;

    let mut first_iter = by_first.into_iter();
    let mut second_iter = by_second.into_iter();
    let mut remaining = n - 2;
    let mut to_first = true;
    while remaining > 0 {
        let (ranked, group) = if to_first {
            (&mut first_iter, &mut first)
        } else {
            (&mut second_iter, &mut second)
        };
        if let Some(next) = ranked.find(|de| !assigned[de.index]) {
            assigned[next.index] = true;
            group.push(next);
            remaining -= 1;
        }
        to_first = !to_first;
    }

    Assignment::new(
        entries[p1].routing_object(),
        entries[p2].routing_object(),
        first,
        second,
        is_leaf,
    )
}
