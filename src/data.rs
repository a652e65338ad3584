//! Loading and synthesising feature matrices for the CLI, tests and benches.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use ndarray::{Array2, ArrayView1, ArrayViewMut1};
use ndarray_rand::rand_distr::{Distribution, Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::error::{ClusterError, Result};
use crate::DataMatrix;

/// Generate a uniform `[0, 1)` data matrix (n rows, dim columns).
pub fn generate_points<R: Rng + ?Sized>(n: usize, dim: usize, rng: &mut R) -> DataMatrix {
    Array2::random_using((n, dim), Uniform::new(0.0, 1.0), rng)
}

/// Generate Gaussian blobs: `n_per_cluster` rows around every row of
/// `centres`, grouped by centre in order.
pub fn generate_blobs<R: Rng + ?Sized>(
    n_per_cluster: usize,
    centres: &DataMatrix,
    spread: f64,
    rng: &mut R,
) -> Result<DataMatrix> {
    let normal = Normal::new(0.0, spread).map_err(|err| {
        ClusterError::InvalidConfig(format!("invalid blob spread {spread}: {err}"))
    })?;
    let mut points = Array2::zeros((n_per_cluster * centres.nrows(), centres.ncols()));

    for (cluster_idx, centre) in centres.outer_iter().enumerate() {
        for sample_idx in 0..n_per_cluster {
            let row_idx = cluster_idx * n_per_cluster + sample_idx;
            synthesise_sample(&centre, points.row_mut(row_idx), &normal, rng);
        }
    }

    Ok(points)
}

fn synthesise_sample<R: Rng + ?Sized>(
    centre: &ArrayView1<f64>,
    mut row: ArrayViewMut1<'_, f64>,
    normal: &Normal<f64>,
    rng: &mut R,
) {
    for (value, &mean) in row.iter_mut().zip(centre.iter()) {
        *value = mean + normal.sample(rng);
    }
}

/// Loads numeric tables into a [`DataMatrix`].
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with a header row and numeric columns only.
    ///
    /// Fields are trimmed before parsing. Every row must have as many
    /// columns as the first one.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataMatrix> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)?;

        let mut values = Vec::new();
        let mut rows = 0usize;
        let mut width = None;
        for row in reader.deserialize::<Vec<f64>>() {
            let row = row?;
            match width {
                None => width = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(ClusterError::InvalidData(format!(
                        "row {} has {} columns, expected {expected}",
                        rows + 1,
                        row.len()
                    )));
                }
                Some(_) => {}
            }
            values.extend(row);
            rows += 1;
        }
        let dim = width.ok_or(ClusterError::EmptyPopulation)?;

        Array2::from_shape_vec((rows, dim), values)
            .map_err(|err| ClusterError::InvalidData(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    #[test]
    fn blobs_surround_their_centres() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let centres = array![[0.0, 0.0], [50.0, 50.0]];
        let data = generate_blobs(40, &centres, 1.0, &mut rng).unwrap();
        assert_eq!(data.dim(), (80, 2));
        for (idx, row) in data.outer_iter().enumerate() {
            let centre = centres.row(idx / 40);
            let offset: f64 = row
                .iter()
                .zip(centre.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            assert!(offset < 10.0);
        }
    }

    #[test]
    fn negative_spread_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let centres = array![[0.0]];
        assert!(matches!(
            generate_blobs(4, &centres, -1.0, &mut rng),
            Err(ClusterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn uniform_points_are_in_unit_cube() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = generate_points(64, 3, &mut rng);
        assert_eq!(data.dim(), (64, 3));
        assert!(data.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn csv_round_trip() {
        let path = std::env::temp_dir().join(format!("clusterlib-{}.csv", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "x,y").unwrap();
            writeln!(file, "0.5,1").unwrap();
            writeln!(file, "2, -3.25").unwrap();
        }
        let data = DataLoader::load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(data, array![[0.5, 1.0], [2.0, -3.25]]);
    }

    #[test]
    fn ragged_csv_is_rejected() {
        let path =
            std::env::temp_dir().join(format!("clusterlib-ragged-{}.csv", std::process::id()));
        std::fs::write(&path, "x,y\n1,2\n3\n").unwrap();
        let err = DataLoader::load_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClusterError::InvalidData(_)));
    }

    #[test]
    fn non_numeric_csv_is_rejected() {
        let path =
            std::env::temp_dir().join(format!("clusterlib-text-{}.csv", std::process::id()));
        std::fs::write(&path, "x,y\n1,2\n3,abc\n").unwrap();
        let err = DataLoader::load_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClusterError::Csv(_)));
    }

    #[test]
    fn header_only_csv_is_empty() {
        let path =
            std::env::temp_dir().join(format!("clusterlib-empty-{}.csv", std::process::id()));
        std::fs::write(&path, "x,y\n").unwrap();
        let err = DataLoader::load_csv(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ClusterError::EmptyPopulation));
    }
}
