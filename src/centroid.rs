//! Per-cluster statistics derived from the current labels of a population.

use ndarray::Array2;

use crate::distance::squared_distance;
use crate::error::{ClusterError, Result};
use crate::point::Population;
use crate::DataMatrix;

/// Element-wise mean of the members of each cluster `0..k`, as rows of a
/// `k × dim` matrix.
///
/// Points that are unassigned or carry a label `>= k` are ignored. A cluster
/// without members yields [`ClusterError::EmptyCluster`].
pub fn centroids(population: &Population, k: usize) -> Result<DataMatrix> {
    if k == 0 {
        return Err(ClusterError::InvalidConfig(
            "k must be greater than zero".into(),
        ));
    }
    let (centroids, counts) = partial_centroids(population, k);
    match counts.iter().position(|&count| count == 0) {
        Some(cid) => Err(ClusterError::EmptyCluster { cluster: cid }),
        None => Ok(centroids),
    }
}

/// Means of the non-empty clusters plus the member count of every cluster.
/// Rows of empty clusters are left at zero for the caller to fill.
pub(crate) fn partial_centroids(population: &Population, k: usize) -> (DataMatrix, Vec<usize>) {
    let (sums, counts) = accumulate(population, k);
    let mut centroids = Array2::zeros((k, population.dim()));
    for (cid, (sum, &count)) in sums.iter().zip(counts.iter()).enumerate() {
        if count == 0 {
            continue;
        }
        for (slot, total) in centroids.row_mut(cid).iter_mut().zip(sum) {
            *slot = total / count as f64;
        }
    }
    (centroids, counts)
}

/// Number of points currently carrying each label `0..k`.
pub fn cluster_sizes(population: &Population, k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for cid in population.iter().filter_map(|p| p.cluster()) {
        if let Some(slot) = counts.get_mut(cid) {
            *slot += 1;
        }
    }
    counts
}

/// Sum of squared distances from every assigned point to its centroid row.
pub fn inertia(population: &Population, centroids: &DataMatrix) -> f64 {
    population
        .iter()
        .filter_map(|point| {
            let cid = point.cluster().filter(|&cid| cid < centroids.nrows())?;
            let row = centroids.row(cid);
            let centre = row.as_slice()?;
            Some(squared_distance(point.value(), centre))
        })
        .sum()
}

fn accumulate(population: &Population, k: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
    let dim = population.dim();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for point in population.iter() {
        let Some(cid) = point.cluster().filter(|&cid| cid < k) else {
            continue;
        };
        for (acc, value) in sums[cid].iter_mut().zip(point.value()) {
            *acc += value;
        }
        counts[cid] += 1;
    }
    (sums, counts)
}
