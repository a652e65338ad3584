//! Dissimilarity measures between feature vectors.
//!
//! Engines only ever see the [`Metric`] trait, so any closure of the shape
//! `Fn(&[f64], &[f64]) -> f64` can replace the default [`Euclidean`] metric.

use crate::error::{ClusterError, Result};

/// A symmetric, non-negative dissimilarity between equal-length vectors.
pub trait Metric {
    /// Raw dissimilarity. Callers guarantee `x.len() == y.len()`.
    fn measure(&self, x: &[f64], y: &[f64]) -> f64;

    /// Checked dissimilarity, failing on vectors of unequal dimensionality.
    fn distance(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        if x.len() != y.len() {
            return Err(ClusterError::DimensionMismatch {
                expected: x.len(),
                found: y.len(),
            });
        }
        Ok(self.measure(x, y))
    }
}

impl<F> Metric for F
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    fn measure(&self, x: &[f64], y: &[f64]) -> f64 {
        self(x, y)
    }
}

/// Euclidean (L2) distance over arbitrary dimensionality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn measure(&self, x: &[f64], y: &[f64]) -> f64 {
        squared_distance(x, y).sqrt()
    }
}

/// Squared Euclidean distance. Cheaper, but not a true metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl Metric for SquaredEuclidean {
    fn measure(&self, x: &[f64], y: &[f64]) -> f64 {
        squared_distance(x, y)
    }
}

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl Metric for Manhattan {
    fn measure(&self, x: &[f64], y: &[f64]) -> f64 {
        x.iter().zip(y.iter()).map(|(a, b)| (a - b).abs()).sum()
    }
}

/// Checked Euclidean distance between two vectors.
pub fn euclidean(x: &[f64], y: &[f64]) -> Result<f64> {
    Euclidean.distance(x, y)
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_is_symmetric_and_zero_on_identity() {
        let points = [
            vec![0.0, 0.0, 0.0],
            vec![1.0, -2.0, 3.5],
            vec![-4.25, 8.0, 0.125],
        ];
        for x in &points {
            assert_eq!(euclidean(x, x).unwrap(), 0.0);
            for y in &points {
                let forward = euclidean(x, y).unwrap();
                let backward = euclidean(y, x).unwrap();
                assert_eq!(forward, backward);
                assert!(forward >= 0.0);
            }
        }
    }

    #[test]
    fn euclidean_three_four_five() {
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]).unwrap(), 5.0);
        assert_eq!(SquaredEuclidean.measure(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(Manhattan.measure(&[0.0, 0.0], &[3.0, -4.0]), 7.0);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let err = euclidean(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn closures_are_metrics() {
        let chebyshev = |x: &[f64], y: &[f64]| {
            x.iter()
                .zip(y)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max)
        };
        assert_eq!(chebyshev.distance(&[0.0, 0.0], &[3.0, -7.0]).unwrap(), 7.0);
        assert!(chebyshev.distance(&[0.0], &[1.0, 2.0]).is_err());
    }
}
