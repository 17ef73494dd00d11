//! Distance functions.
//!
//! The tree never assumes coordinates: all it needs is a symmetric,
//! non-negative function with `d(a, a) == 0`. Pruning bounds are only valid
//! when the function also satisfies the triangle inequality; this is not
//! checked.

/// Identity of a distance function, used to decide whether an index built
/// with one distance can answer queries declared with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceKind {
    Euclidean,
    SquaredEuclidean,
    Manhattan,
    /// Caller-supplied function, matched by name
    Custom(&'static str),
}

/// Distance between two objects of type `O`.
pub trait Distance<O: ?Sized>: Send + Sync {
    /// Compute the distance between `a` and `b`.
    fn distance(&self, a: &O, b: &O) -> f64;

    /// Which function this is.
    fn kind(&self) -> DistanceKind;

    /// Whether values are squares of a metric (no triangle inequality).
    fn is_squared(&self) -> bool {
        false
    }
}

impl<O: ?Sized, D: Distance<O> + ?Sized> Distance<O> for &D {
    fn distance(&self, a: &O, b: &O) -> f64 {
        (**self).distance(a, b)
    }

    fn kind(&self) -> DistanceKind {
        (**self).kind()
    }

    fn is_squared(&self) -> bool {
        (**self).is_squared()
    }
}

fn squared_sum(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl<O: AsRef<[f64]> + ?Sized> Distance<O> for EuclideanDistance {
    fn distance(&self, a: &O, b: &O) -> f64 {
        squared_sum(a.as_ref(), b.as_ref()).sqrt()
    }

    fn kind(&self) -> DistanceKind {
        DistanceKind::Euclidean
    }
}

/// Squared Euclidean distance. Cheaper, monotone in L2, but not a metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclideanDistance;

impl<O: AsRef<[f64]> + ?Sized> Distance<O> for SquaredEuclideanDistance {
    fn distance(&self, a: &O, b: &O) -> f64 {
        squared_sum(a.as_ref(), b.as_ref())
    }

    fn kind(&self) -> DistanceKind {
        DistanceKind::SquaredEuclidean
    }

    fn is_squared(&self) -> bool {
        true
    }
}

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl<O: AsRef<[f64]> + ?Sized> Distance<O> for ManhattanDistance {
    fn distance(&self, a: &O, b: &O) -> f64 {
        let (a, b) = (a.as_ref(), b.as_ref());
        assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }

    fn kind(&self) -> DistanceKind {
        DistanceKind::Manhattan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((EuclideanDistance.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert_eq!(EuclideanDistance.distance(&a, &a), 0.0);
    }

    #[test]
    fn test_squared_euclidean() {
        let a = [1.0, 1.0];
        let b = [4.0, 5.0];
        assert_eq!(SquaredEuclideanDistance.distance(&a[..], &b[..]), 25.0);
        assert!(Distance::<[f64]>::is_squared(&SquaredEuclideanDistance));
    }

    #[test]
    fn test_manhattan_symmetric() {
        let a = vec![1.0, -2.0, 3.0];
        let b = vec![-1.0, 2.0, 0.0];
        let ab = ManhattanDistance.distance(&a, &b);
        assert_eq!(ab, 9.0);
        assert_eq!(ab, ManhattanDistance.distance(&b, &a));
    }

    #[test]
    #[should_panic(expected = "same dimension")]
    fn test_dimension_mismatch_panics() {
        EuclideanDistance.distance(&vec![1.0], &vec![1.0, 2.0]);
    }

    #[test]
    fn test_kind_through_reference() {
        let d = &EuclideanDistance;
        assert_eq!(Distance::<Vec<f64>>::kind(&d), DistanceKind::Euclidean);
    }
}
