//! Labeled points and the population they live in.

use std::fmt;

use ndarray::Array2;

use crate::error::{ClusterError, Result};
use crate::DataMatrix;

/// A feature vector together with its current and previous cluster label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint {
    value: Vec<f64>,
    cluster: Option<usize>,
    previous_cluster: Option<usize>,
}

impl LabeledPoint {
    /// Wrap a raw feature vector. The point starts unassigned.
    pub fn new(value: Vec<f64>) -> Self {
        Self {
            value,
            cluster: None,
            previous_cluster: None,
        }
    }

    /// Coordinates of the point.
    pub fn value(&self) -> &[f64] {
        &self.value
    }

    /// Current label, `None` until the first assignment.
    pub fn cluster(&self) -> Option<usize> {
        self.cluster
    }

    /// Label held before the most recent assignment.
    pub fn previous_cluster(&self) -> Option<usize> {
        self.previous_cluster
    }

    /// Move the current label into the history slot and store `cluster`.
    ///
    /// The history always shifts, even when `cluster` equals the current label.
    pub fn assign(&mut self, cluster: usize) {
        self.previous_cluster = self.cluster;
        self.cluster = Some(cluster);
    }

    /// Assign the previous label back. This is itself an assignment, so the
    /// label being undone becomes the new history.
    pub fn revert(&mut self) {
        let restored = self.previous_cluster;
        self.previous_cluster = self.cluster;
        self.cluster = restored;
    }

    /// Whether the most recent assignment changed the label.
    pub fn changed(&self) -> bool {
        self.cluster != self.previous_cluster
    }

    /// Consume the point and return its coordinates.
    pub fn into_value(self) -> Vec<f64> {
        self.value
    }
}

impl fmt::Display for LabeledPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)?;
        match self.cluster {
            Some(cluster) => write!(f, " -> {cluster}"),
            None => write!(f, " -> unassigned"),
        }
    }
}

/// Ordered collection of labeled points sharing one dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    points: Vec<LabeledPoint>,
    dim: usize,
}

impl Population {
    /// Build a population from raw feature vectors.
    ///
    /// Fails on an empty input or on rows of differing length.
    pub fn new(values: Vec<Vec<f64>>) -> Result<Self> {
        let dim = values.first().ok_or(ClusterError::EmptyPopulation)?.len();
        if let Some(row) = values.iter().find(|row| row.len() != dim) {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                found: row.len(),
            });
        }
        Ok(Self {
            points: values.into_iter().map(LabeledPoint::new).collect(),
            dim,
        })
    }

    /// Build a population from the rows of a data matrix.
    pub fn from_matrix(points: &DataMatrix) -> Result<Self> {
        Self::new(points.rows().into_iter().map(|row| row.to_vec()).collect())
    }

    /// Export the feature vectors as a data matrix (rows = points).
    pub fn to_matrix(&self) -> DataMatrix {
        let mut matrix = Array2::zeros((self.points.len(), self.dim));
        for (mut row, point) in matrix.rows_mut().into_iter().zip(&self.points) {
            for (slot, &value) in row.iter_mut().zip(point.value()) {
                *slot = value;
            }
        }
        matrix
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Feature dimensionality shared by every point.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[LabeledPoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [LabeledPoint] {
        &mut self.points
    }

    pub fn get(&self, index: usize) -> Option<&LabeledPoint> {
        self.points.get(index)
    }

    /// Current label of every point, in population order.
    pub fn labels(&self) -> Vec<Option<usize>> {
        self.points.iter().map(LabeledPoint::cluster).collect()
    }

    /// Number of points whose latest assignment changed their label.
    pub fn changed(&self) -> usize {
        self.points.iter().filter(|point| point.changed()).count()
    }

    /// Append a point, enforcing the population's dimensionality.
    pub fn push(&mut self, point: LabeledPoint) -> Result<()> {
        if point.value().len() != self.dim {
            return Err(ClusterError::DimensionMismatch {
                expected: self.dim,
                found: point.value().len(),
            });
        }
        self.points.push(point);
        Ok(())
    }

    /// Remove the points at `indices`, keeping the remaining order intact.
    /// Removed points are returned in the order `indices` lists them.
    pub(crate) fn extract(&mut self, indices: &[usize]) -> Vec<LabeledPoint> {
        let mut slots: Vec<Option<LabeledPoint>> = self.points.drain(..).map(Some).collect();
        let taken = indices
            .iter()
            .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
            .collect();
        self.points = slots.into_iter().flatten().collect();
        taken
    }

    pub(crate) fn values(&self) -> Vec<&[f64]> {
        self.points.iter().map(LabeledPoint::value).collect()
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a LabeledPoint;
    type IntoIter = std::slice::Iter<'a, LabeledPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn assign_shifts_history_even_when_label_repeats() {
        let mut point = LabeledPoint::new(vec![1.0, 2.0]);
        assert_eq!(point.cluster(), None);
        assert_eq!(point.previous_cluster(), None);

        point.assign(3);
        assert_eq!(point.cluster(), Some(3));
        assert_eq!(point.previous_cluster(), None);
        assert!(point.changed());

        point.assign(3);
        assert_eq!(point.cluster(), Some(3));
        assert_eq!(point.previous_cluster(), Some(3));
        assert!(!point.changed());

        point.assign(1);
        assert_eq!(point.previous_cluster(), Some(3));
    }

    #[test]
    fn revert_restores_previous_label() {
        let mut point = LabeledPoint::new(vec![0.0]);
        point.assign(0);
        point.assign(2);
        point.revert();
        assert_eq!(point.cluster(), Some(0));
        assert_eq!(point.previous_cluster(), Some(2));
    }

    #[test]
    fn population_rejects_empty_and_ragged_input() {
        assert!(matches!(
            Population::new(Vec::new()),
            Err(ClusterError::EmptyPopulation)
        ));
        let err = Population::new(vec![vec![0.0, 1.0], vec![2.0]]).unwrap_err();
        assert!(matches!(
            err,
            ClusterError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn matrix_round_trip_preserves_rows() {
        let matrix = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let population = Population::from_matrix(&matrix).unwrap();
        assert_eq!(population.len(), 3);
        assert_eq!(population.dim(), 2);
        assert_eq!(population.to_matrix(), matrix);
    }

    #[test]
    fn extract_keeps_remaining_order() {
        let mut population =
            Population::new((0..5).map(|i| vec![i as f64]).collect()).unwrap();
        let taken = population.extract(&[3, 0]);
        let taken: Vec<f64> = taken.iter().map(|p| p.value()[0]).collect();
        assert_eq!(taken, vec![3.0, 0.0]);
        let left: Vec<f64> = population.iter().map(|p| p.value()[0]).collect();
        assert_eq!(left, vec![1.0, 2.0, 4.0]);
    }
}
