//! One interface over the three clustering strategies.

use rand::RngCore;
use serde::Serialize;

use crate::error::Result;
use crate::hillclimb::{info_theoretic_partition, HillClimbConfig};
use crate::kmeans::{partition, KMeansConfig};
use crate::observe::EngineKind;
use crate::point::Population;
use crate::qt::{qt_clust, QtConfig};

/// What any engine reports after labelling a population in place.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub engine: EngineKind,
    /// Number of cluster labels in use (`0..clusters`).
    pub clusters: usize,
    /// Rounds (k-means), emitted clusters (QT) or sweeps (hill-climbing).
    pub iterations: usize,
    pub converged: bool,
    pub cluster_sizes: Vec<usize>,
}

/// A clustering strategy that labels every point of a population.
pub trait Engine {
    fn kind(&self) -> EngineKind;

    fn run(&self, population: &mut Population, rng: &mut dyn RngCore) -> Result<RunSummary>;
}

impl Engine for KMeansConfig {
    fn kind(&self) -> EngineKind {
        EngineKind::KMeans
    }

    fn run(&self, population: &mut Population, rng: &mut dyn RngCore) -> Result<RunSummary> {
        let run = partition(population, self, rng)?;
        Ok(RunSummary {
            engine: self.kind(),
            clusters: self.k,
            iterations: run.outcome.iterations,
            converged: run.outcome.converged,
            cluster_sizes: run.outcome.cluster_sizes,
        })
    }
}

impl Engine for HillClimbConfig {
    fn kind(&self) -> EngineKind {
        EngineKind::HillClimb
    }

    fn run(&self, population: &mut Population, rng: &mut dyn RngCore) -> Result<RunSummary> {
        let outcome = info_theoretic_partition(population, self, rng)?;
        Ok(RunSummary {
            engine: self.kind(),
            clusters: self.k,
            iterations: outcome.sweeps,
            converged: outcome.converged,
            cluster_sizes: outcome.cluster_sizes,
        })
    }
}

/// Runs QT-Clust to exhaustion on a copy of the population and writes the
/// emission index of every cluster back onto the original points, so the
/// caller's point order is preserved.
impl Engine for QtConfig {
    fn kind(&self) -> EngineKind {
        EngineKind::QtClust
    }

    fn run(&self, population: &mut Population, _rng: &mut dyn RngCore) -> Result<RunSummary> {
        let mut working = population.clone();
        let mut cluster_sizes = Vec::new();
        for cluster in qt_clust(self.threshold, &mut working)? {
            let label = cluster_sizes.len();
            let points = population.points_mut();
            for &origin in cluster.origins() {
                points[origin].assign(label);
            }
            cluster_sizes.push(cluster.len());
        }
        Ok(RunSummary {
            engine: self.kind(),
            clusters: cluster_sizes.len(),
            iterations: cluster_sizes.len(),
            converged: true,
            cluster_sizes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_blobs;
    use crate::kmeans::InitStrategy;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn engines_are_interchangeable() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let centres = array![[0.0, 0.0], [15.0, 15.0]];
        let data = generate_blobs(10, &centres, 0.5, &mut rng).unwrap();

        let engines: Vec<Box<dyn Engine>> = vec![
            Box::new(KMeansConfig {
                k: 2,
                init: InitStrategy::KMeansPlusPlus,
                ..KMeansConfig::default()
            }),
            Box::new(QtConfig { threshold: 6.0 }),
            Box::new(HillClimbConfig::with_k(2)),
        ];

        for engine in &engines {
            let mut population = Population::from_matrix(&data).unwrap();
            let summary = engine.run(&mut population, &mut rng).unwrap();
            assert_eq!(summary.engine, engine.kind());
            assert_eq!(population.len(), 20);
            assert_eq!(summary.cluster_sizes.iter().sum::<usize>(), 20);
            assert!(population
                .iter()
                .all(|p| p.cluster().map_or(false, |label| label < summary.clusters)));
        }
    }

    #[test]
    fn qt_engine_labels_points_in_place() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut population =
            Population::new(vec![vec![10.0], vec![0.0], vec![10.4], vec![0.5], vec![1.0]])
                .unwrap();
        let summary = QtConfig { threshold: 2.0 }
            .run(&mut population, &mut rng)
            .unwrap();
        assert_eq!(summary.clusters, 2);
        assert_eq!(summary.cluster_sizes, vec![3, 2]);
        assert_eq!(
            population.labels(),
            vec![Some(1), Some(0), Some(1), Some(0), Some(0)]
        );
        let values: Vec<f64> = population.iter().map(|p| p.value()[0]).collect();
        assert_eq!(values, vec![10.0, 0.0, 10.4, 0.5, 1.0]);
    }
}
