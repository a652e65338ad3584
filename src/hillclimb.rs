//! Hill-climbing information-theoretic partitioning (Gokcay & Principe 2002).
//!
//! Labels start uniformly random. Each point then proposes to pull its
//! neighbourhood group (itself plus the `group_size` points grown around it)
//! into its own cluster; the proposal stands only if it lowers the
//! [`Objective`], otherwise every member is reverted. Sweeps over all points
//! repeat until one accepts nothing. The group size starts at `n / k` and
//! doubles after every pass while it is still smaller than `n`.
//!
//! A cluster that runs empty during a proposal makes the objective
//! undefined; such proposals score [`UNFAVOURABLE`] and are rejected. The
//! starting labels cover every cluster, so the best labeling never has an
//! empty one.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::centroid::{self, cluster_sizes};
use crate::distance::{squared_distance, Euclidean, Metric};
use crate::error::{ClusterError, Result};
use crate::linkage::{grow, Linkage, StopRule};
use crate::observe::{EngineKind, Observer, Silent, Snapshot};
use crate::point::Population;

/// Score given to labelings the objective cannot evaluate.
pub const UNFAVOURABLE: f64 = f64::MAX;

/// Scores a labeling of `population` over clusters `0..k`. Lower is better.
pub trait Objective {
    fn evaluate(&self, population: &Population, k: usize) -> Result<f64>;
}

impl<F> Objective for F
where
    F: Fn(&Population, usize) -> Result<f64>,
{
    fn evaluate(&self, population: &Population, k: usize) -> Result<f64> {
        self(population, k)
    }
}

/// Negated mean squared distance over all unordered centroid pairs,
/// normalised by `k(k-1)/2`. Pushing centroids apart lowers the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidSeparation;

impl Objective for CentroidSeparation {
    fn evaluate(&self, population: &Population, k: usize) -> Result<f64> {
        let centroids = centroid::centroids(population, k)?;
        let rows: Vec<Vec<f64>> = centroids.outer_iter().map(|row| row.to_vec()).collect();
        Ok(-mean_over_pairs(k, |a, b| squared_distance(&rows[a], &rows[b])))
    }
}

/// Cross information potential between clusters: the Gaussian-kernel
/// similarity of every cross-cluster member pair, averaged per cluster pair
/// and then over the `k(k-1)/2` cluster pairs.
#[derive(Debug, Clone, Copy)]
pub struct CrossInformationPotential {
    /// Kernel width σ; the kernel is `exp(-d² / (2σ²))`.
    pub bandwidth: f64,
}

impl Default for CrossInformationPotential {
    fn default() -> Self {
        Self { bandwidth: 1.0 }
    }
}

impl Objective for CrossInformationPotential {
    fn evaluate(&self, population: &Population, k: usize) -> Result<f64> {
        if self.bandwidth.is_nan() || self.bandwidth <= 0.0 {
            return Err(ClusterError::InvalidConfig(
                "bandwidth must be positive".into(),
            ));
        }
        let mut clusters: Vec<Vec<&[f64]>> = vec![Vec::new(); k];
        for point in population.iter() {
            if let Some(members) = point.cluster().and_then(|cid| clusters.get_mut(cid)) {
                members.push(point.value());
            }
        }
        if let Some(cid) = clusters.iter().position(Vec::is_empty) {
            return Err(ClusterError::EmptyCluster { cluster: cid });
        }

        let scale = 2.0 * self.bandwidth * self.bandwidth;
        Ok(mean_over_pairs(k, |a, b| {
            let mut potential = 0.0;
            for x in &clusters[a] {
                for y in &clusters[b] {
                    potential += (-squared_distance(x, y) / scale).exp();
                }
            }
            potential / (clusters[a].len() * clusters[b].len()) as f64
        }))
    }
}

fn mean_over_pairs(k: usize, mut term: impl FnMut(usize, usize) -> f64) -> f64 {
    let pairs = k * k.saturating_sub(1) / 2;
    if pairs == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for a in 0..k {
        for b in 0..a {
            total += term(a, b);
        }
    }
    total / pairs as f64
}

/// Settings for a hill-climbing run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HillClimbConfig {
    /// Number of clusters.
    pub k: usize,
    /// Sweep cap per pass before the pass is abandoned as non-converged.
    pub max_sweeps: usize,
    /// How neighbourhood groups are grown.
    pub linkage: Linkage,
}

impl Default for HillClimbConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_sweeps: 100,
            linkage: Linkage::Single,
        }
    }
}

impl HillClimbConfig {
    /// Config with `k` clusters and default settings otherwise.
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Check `k` and `max_sweeps` against the population about to be labelled.
    pub fn validate(&self, population: &Population) -> Result<()> {
        if population.is_empty() {
            return Err(ClusterError::EmptyPopulation);
        }
        if self.k == 0 {
            return Err(ClusterError::InvalidConfig(
                "k must be greater than zero".into(),
            ));
        }
        if population.len() < self.k {
            return Err(ClusterError::InvalidConfig(format!(
                "population has {} points but k = {}; add more data or decrease k",
                population.len(),
                self.k
            )));
        }
        if self.max_sweeps == 0 {
            return Err(ClusterError::InvalidConfig(
                "max_sweeps must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Diagnostics of a hill-climbing run.
#[derive(Debug, Clone, Serialize)]
pub struct HillClimbOutcome {
    /// Objective of the random starting labeling.
    pub initial_objective: f64,
    /// Best (final) objective.
    pub objective: f64,
    /// Number of group-size passes.
    pub passes: usize,
    /// Sweeps over the population across all passes.
    pub sweeps: usize,
    /// Accepted group relabelings across all passes.
    pub accepted: usize,
    /// False if any pass hit `max_sweeps` while still improving.
    pub converged: bool,
    pub cluster_sizes: Vec<usize>,
}

/// Hill-climb `population` into `config.k` clusters using
/// [`CentroidSeparation`] and Euclidean groups.
pub fn info_theoretic_partition<R: Rng + ?Sized>(
    population: &mut Population,
    config: &HillClimbConfig,
    rng: &mut R,
) -> Result<HillClimbOutcome> {
    info_theoretic_partition_with(
        population,
        config,
        &CentroidSeparation,
        &Euclidean,
        rng,
        &mut Silent,
    )
}

/// [`info_theoretic_partition`] with a custom objective, metric and observer.
pub fn info_theoretic_partition_with<J, M, R, O>(
    population: &mut Population,
    config: &HillClimbConfig,
    objective: &J,
    metric: &M,
    rng: &mut R,
    observer: &mut O,
) -> Result<HillClimbOutcome>
where
    J: Objective + ?Sized,
    M: Metric + ?Sized,
    R: Rng + ?Sized,
    O: Observer + ?Sized,
{
    config.validate(population)?;
    let k = config.k;
    let n = population.len();

    random_labels(population, k, rng);

    let mut climber = HillClimber {
        k,
        config,
        objective,
        metric,
        best: score(objective, population, k)?,
        sweeps: 0,
    };
    let initial_objective = climber.best;

    let mut passes = 0usize;
    let mut accepted = 0usize;
    let mut converged = true;
    let mut group_size = n / k;
    while group_size < n {
        let pass = climber.pass(population, group_size, observer)?;
        passes += 1;
        accepted += pass.accepted;
        converged &= pass.converged;
        group_size *= 2;
    }

    tracing::info!(
        k,
        passes,
        sweeps = climber.sweeps,
        accepted,
        initial_objective,
        objective = climber.best,
        converged,
        "hill-climbing partition finished"
    );

    Ok(HillClimbOutcome {
        initial_objective,
        objective: climber.best,
        passes,
        sweeps: climber.sweeps,
        accepted,
        converged,
        cluster_sizes: cluster_sizes(population, k),
    })
}

/// Uniformly random labels in `0..k` with every cluster represented: `k`
/// distinct points are drawn to carry one label each, the rest are free.
/// A starting cluster with no members could never be refilled, since every
/// proposal that touches an empty cluster scores [`UNFAVOURABLE`].
fn random_labels<R: Rng + ?Sized>(population: &mut Population, k: usize, rng: &mut R) {
    let n = population.len();
    let mut labels: Vec<usize> = (0..n).map(|_| rng.gen_range(0..k)).collect();
    for (label, idx) in index::sample(rng, n, k).into_iter().enumerate() {
        labels[idx] = label;
    }
    for (point, label) in population.points_mut().iter_mut().zip(labels) {
        point.assign(label);
    }
}

struct PassStats {
    accepted: usize,
    converged: bool,
}

struct HillClimber<'a, J: ?Sized, M: ?Sized> {
    k: usize,
    config: &'a HillClimbConfig,
    objective: &'a J,
    metric: &'a M,
    best: f64,
    sweeps: usize,
}

impl<J, M> HillClimber<'_, J, M>
where
    J: Objective + ?Sized,
    M: Metric + ?Sized,
{
    /// Sweep at a fixed group size until a sweep accepts nothing.
    fn pass<O: Observer + ?Sized>(
        &mut self,
        population: &mut Population,
        group_size: usize,
        observer: &mut O,
    ) -> Result<PassStats> {
        let groups: Vec<Vec<usize>> = {
            let values = population.values();
            (0..values.len())
                .map(|seed| {
                    grow(
                        &values,
                        seed,
                        self.config.linkage,
                        StopRule::Count(group_size),
                        self.metric,
                    )
                    .members
                })
                .collect()
        };

        let mut accepted = 0usize;
        let mut pass_sweeps = 0usize;
        loop {
            let before = population.labels();
            let swept = self.sweep(population, &groups)?;
            accepted += swept;
            pass_sweeps += 1;
            self.sweeps += 1;

            let delta = population
                .labels()
                .iter()
                .zip(&before)
                .filter(|(now, then)| now != then)
                .count();
            tracing::debug!(
                group_size,
                sweep = pass_sweeps,
                accepted = swept,
                delta,
                objective = self.best,
                "hill-climbing sweep complete"
            );
            observer.observe(&Snapshot {
                engine: EngineKind::HillClimb,
                iteration: self.sweeps,
                population: &*population,
                centroids: None,
                delta: Some(delta),
                objective: Some(self.best),
            });

            if swept == 0 {
                return Ok(PassStats {
                    accepted,
                    converged: true,
                });
            }
            if pass_sweeps >= self.config.max_sweeps {
                tracing::warn!(
                    group_size,
                    sweeps = pass_sweeps,
                    "hill-climbing pass hit max_sweeps while still improving"
                );
                return Ok(PassStats {
                    accepted,
                    converged: false,
                });
            }
        }
    }

    /// One proposal per point; returns the number of accepted proposals.
    fn sweep(&mut self, population: &mut Population, groups: &[Vec<usize>]) -> Result<usize> {
        let mut accepted = 0usize;
        for (seed, group) in groups.iter().enumerate() {
            let Some(label) = population.points()[seed].cluster() else {
                continue;
            };
            let points = population.points_mut();
            if group.iter().all(|&m| points[m].cluster() == Some(label)) {
                continue;
            }
            for &member in group {
                points[member].assign(label);
            }

            let candidate = score(self.objective, population, self.k)?;
            if candidate < self.best {
                self.best = candidate;
                accepted += 1;
            } else {
                let points = population.points_mut();
                for &member in group {
                    points[member].revert();
                }
            }
        }
        Ok(accepted)
    }
}

/// Objective value with empty clusters and NaN mapped to [`UNFAVOURABLE`].
fn score<J: Objective + ?Sized>(objective: &J, population: &Population, k: usize) -> Result<f64> {
    match objective.evaluate(population, k) {
        Ok(value) if value.is_nan() => Ok(UNFAVOURABLE),
        Ok(value) => Ok(value),
        Err(ClusterError::EmptyCluster { .. }) => Ok(UNFAVOURABLE),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_blobs;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn labelled(values: &[f64], labels: &[usize]) -> Population {
        let mut population = Population::new(values.iter().map(|&v| vec![v]).collect()).unwrap();
        for (point, &label) in population.points_mut().iter_mut().zip(labels) {
            point.assign(label);
        }
        population
    }

    #[test]
    fn centroid_separation_prefers_spread_centroids() {
        let split = labelled(&[0.0, 1.0, 10.0, 11.0], &[0, 0, 1, 1]);
        let mixed = labelled(&[0.0, 1.0, 10.0, 11.0], &[0, 1, 0, 1]);
        let split_score = CentroidSeparation.evaluate(&split, 2).unwrap();
        let mixed_score = CentroidSeparation.evaluate(&mixed, 2).unwrap();
        assert_eq!(split_score, -100.0);
        assert_eq!(mixed_score, -1.0);
        assert!(split_score < mixed_score);
    }

    #[test]
    fn cross_information_potential_of_two_points() {
        let population = labelled(&[0.0, 1.0], &[0, 1]);
        let cip = CrossInformationPotential { bandwidth: 1.0 };
        let value = cip.evaluate(&population, 2).unwrap();
        assert!((value - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn empty_clusters_score_as_unfavourable() {
        let population = labelled(&[0.0, 1.0], &[0, 0]);
        assert!(matches!(
            CentroidSeparation.evaluate(&population, 2),
            Err(ClusterError::EmptyCluster { cluster: 1 })
        ));
        assert_eq!(score(&CentroidSeparation, &population, 2).unwrap(), UNFAVOURABLE);
        let cip = CrossInformationPotential::default();
        assert_eq!(score(&cip, &population, 2).unwrap(), UNFAVOURABLE);
    }

    #[test]
    fn pass_without_improvement_leaves_labels_unchanged() {
        let values = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let labels = [0, 0, 0, 1, 1, 1];
        let mut population = labelled(&values, &labels);
        let config = HillClimbConfig::with_k(2);
        let best = CentroidSeparation.evaluate(&population, 2).unwrap();
        let mut climber = HillClimber {
            k: 2,
            config: &config,
            objective: &CentroidSeparation,
            metric: &Euclidean,
            best,
            sweeps: 0,
        };

        let stats = climber.pass(&mut population, 3, &mut Silent).unwrap();

        assert_eq!(stats.accepted, 0);
        assert!(stats.converged);
        assert_eq!(climber.sweeps, 1);
        assert_eq!(climber.best, best);
        let expected: Vec<_> = labels.iter().map(|&l| Some(l)).collect();
        assert_eq!(population.labels(), expected);
    }

    #[test]
    fn sweep_cap_reports_non_convergence() {
        let values = [0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let mut population = labelled(&values, &[0, 1, 0, 1, 0, 1]);
        let config = HillClimbConfig {
            k: 2,
            max_sweeps: 1,
            ..HillClimbConfig::default()
        };
        let initial = CentroidSeparation.evaluate(&population, 2).unwrap();
        let mut climber = HillClimber {
            k: 2,
            config: &config,
            objective: &CentroidSeparation,
            metric: &Euclidean,
            best: initial,
            sweeps: 0,
        };

        let stats = climber.pass(&mut population, 3, &mut Silent).unwrap();

        assert!(stats.accepted > 0);
        assert!(!stats.converged);
        assert_eq!(climber.sweeps, 1);
        assert!(climber.best < initial);
    }

    #[test]
    fn starting_labels_cover_every_cluster() {
        let data = array![[0.0], [0.5], [1.0], [8.0], [8.5], [9.0], [20.0], [21.0]];
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut population = Population::from_matrix(&data).unwrap();
            let outcome =
                info_theoretic_partition(&mut population, &HillClimbConfig::with_k(3), &mut rng)
                    .unwrap();
            assert!(outcome.initial_objective < UNFAVOURABLE, "seed {seed}");
            assert!(outcome.objective <= outcome.initial_objective);
            assert!(
                outcome.cluster_sizes.iter().all(|&size| size > 0),
                "seed {seed}: {:?}",
                outcome.cluster_sizes
            );
        }

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut population = Population::from_matrix(&array![[0.0], [1.0], [2.0]]).unwrap();
        random_labels(&mut population, 3, &mut rng);
        let mut labels: Vec<_> = population.labels().into_iter().flatten().collect();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn accepted_relabelings_strictly_lower_the_objective() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let centres = array![[0.0, 0.0], [12.0, 12.0]];
        let data = generate_blobs(15, &centres, 1.0, &mut rng).unwrap();
        let mut population = Population::from_matrix(&data).unwrap();

        let mut trace = Vec::new();
        let mut observer = |snapshot: &Snapshot<'_>| {
            assert_eq!(snapshot.engine, EngineKind::HillClimb);
            trace.push((snapshot.delta.unwrap(), snapshot.objective.unwrap()));
        };
        let outcome = info_theoretic_partition_with(
            &mut population,
            &HillClimbConfig::with_k(2),
            &CentroidSeparation,
            &Euclidean,
            &mut rng,
            &mut observer,
        )
        .unwrap();

        assert_eq!(trace.len(), outcome.sweeps);
        let mut previous = outcome.initial_objective;
        for &(delta, objective) in &trace {
            assert!(objective <= previous);
            if delta == 0 {
                assert_eq!(objective, previous);
            }
            previous = objective;
        }
        if outcome.accepted > 0 {
            assert!(outcome.objective < outcome.initial_objective);
        }
        let recomputed = score(&CentroidSeparation, &population, 2).unwrap();
        assert_eq!(recomputed, outcome.objective);
        assert_eq!(outcome.cluster_sizes.iter().sum::<usize>(), 30);
        // n / k = 15, then 30 == n stops the doubling.
        assert_eq!(outcome.passes, 1);
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let data = array![[0.0], [0.5], [1.0], [8.0], [8.5], [9.0], [20.0], [21.0]];
        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut population = Population::from_matrix(&data).unwrap();
            info_theoretic_partition(&mut population, &HillClimbConfig::with_k(3), &mut rng)
                .unwrap();
            population.labels()
        };
        assert_eq!(run(4), run(4));
        assert!(run(4).iter().all(|label| label.map_or(false, |l| l < 3)));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut population = labelled(&[0.0, 1.0], &[0, 0]);
        assert!(matches!(
            info_theoretic_partition(&mut population, &HillClimbConfig::with_k(0), &mut rng),
            Err(ClusterError::InvalidConfig(_))
        ));
        assert!(matches!(
            info_theoretic_partition(&mut population, &HillClimbConfig::with_k(3), &mut rng),
            Err(ClusterError::InvalidConfig(_))
        ));
    }
}
