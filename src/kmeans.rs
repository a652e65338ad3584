//! Centroid-based partitioning (Lloyd's k-means) over a labeled population.
//!
//! Each round assigns every point to its nearest centroid, counts the points
//! whose label changed (the *delta*), and recomputes the centroids as
//! per-cluster means. The loop stops once the delta drops to `min_delta` or
//! below. On a fresh population the first delta always equals the population
//! size, so at least one full assignment/update cycle runs.

use std::fmt;

use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::centroid::{self, cluster_sizes, partial_centroids};
use crate::distance::{squared_distance, Euclidean, Metric};
use crate::error::{ClusterError, Result};
use crate::observe::{EngineKind, Observer, Silent, Snapshot};
use crate::point::Population;
use crate::DataMatrix;

/// Strategy used to seed initial centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InitStrategy {
    /// Draw `k` population values uniformly, with replacement.
    ///
    /// The same value can be drawn twice. The duplicate centroid then loses
    /// every tie to the lower index and its cluster starts out empty, which
    /// fails the run with [`ClusterError::EmptyCluster`] under
    /// [`EmptyClusterPolicy::Fail`].
    #[default]
    Sample,
    /// K-Means++ initialisation as described by Arthur/Vassilvitskii.
    #[serde(alias = "kmeans++", alias = "k-means++")]
    KMeansPlusPlus,
}

impl fmt::Display for InitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitStrategy::Sample => write!(f, "sample"),
            InitStrategy::KMeansPlusPlus => write!(f, "kmeans++"),
        }
    }
}

impl std::str::FromStr for InitStrategy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sample" | "random" => Ok(Self::Sample),
            "kmeans++" | "k-means++" => Ok(Self::KMeansPlusPlus),
            other => Err(ClusterError::InvalidConfig(format!(
                "unsupported init strategy '{other}'"
            ))),
        }
    }
}

/// What the update step does when a cluster loses all of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyClusterPolicy {
    /// Abort the run with [`ClusterError::EmptyCluster`].
    #[default]
    Fail,
    /// Respawn the dead centroid at a random population member.
    Reseed,
}

impl fmt::Display for EmptyClusterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyClusterPolicy::Fail => write!(f, "fail"),
            EmptyClusterPolicy::Reseed => write!(f, "reseed"),
        }
    }
}

impl std::str::FromStr for EmptyClusterPolicy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "reseed" => Ok(Self::Reseed),
            other => Err(ClusterError::InvalidConfig(format!(
                "unsupported empty-cluster policy '{other}'"
            ))),
        }
    }
}

/// Configurable knobs for a k-means run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of centroids to optimise.
    pub k: usize,
    /// Maximum rounds before giving up on convergence.
    pub max_iter: usize,
    /// Stop once at most this many points change cluster in a round.
    pub min_delta: usize,
    /// Centroid initialisation strategy.
    pub init: InitStrategy,
    /// Behaviour when a cluster becomes empty.
    pub empty_cluster: EmptyClusterPolicy,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 8,
            max_iter: 300,
            min_delta: 0,
            init: InitStrategy::default(),
            empty_cluster: EmptyClusterPolicy::default(),
        }
    }
}

impl KMeansConfig {
    /// Config with `k` clusters and default settings otherwise.
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Validate configuration parameters for a specific population.
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
        if self.max_iter == 0 {
            return Err(ClusterError::InvalidConfig(
                "max_iter must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// K-means model: the current centroids plus the config that drives them.
#[derive(Debug, Clone)]
pub struct KMeans<M = Euclidean> {
    config: KMeansConfig,
    centroids: DataMatrix,
    metric: M,
}

impl KMeans<Euclidean> {
    /// Create a Euclidean model from explicit starting centroids (rows).
    pub fn new(config: KMeansConfig, centroids: DataMatrix) -> Self {
        Self::with_metric(config, centroids, Euclidean)
    }
}

impl<M: Metric> KMeans<M> {
    /// Create a model with a custom distance metric. `config.k` is taken
    /// from the number of centroid rows.
    pub fn with_metric(mut config: KMeansConfig, centroids: DataMatrix, metric: M) -> Self {
        config.k = centroids.nrows();
        Self {
            config,
            centroids: centroids.as_standard_layout().into_owned(),
            metric,
        }
    }

    /// Settings the model was built with.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Current centroids as rows (`k` × `dim`).
    pub fn centroids(&self) -> &DataMatrix {
        &self.centroids
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    fn centres(&self) -> std::slice::ChunksExact<'_, f64> {
        let dim = self.centroids.ncols().max(1);
        self.centroids.as_slice().unwrap_or(&[]).chunks_exact(dim)
    }

    /// Index of the nearest centroid; ties go to the lowest index.
    pub fn predict_point(&self, point: &[f64]) -> usize {
        debug_assert_eq!(point.len(), self.centroids.ncols());
        let mut best = 0usize;
        let mut best_distance = f64::INFINITY;
        for (cid, centre) in self.centres().enumerate() {
            let distance = self.metric.measure(point, centre);
            if distance < best_distance {
                best_distance = distance;
                best = cid;
            }
        }
        best
    }

    /// Assignment step: relabel every point with its nearest centroid and
    /// return the number of points whose label changed.
    pub fn assign(&self, population: &mut Population) -> usize {
        for point in population.points_mut() {
            let cid = self.predict_point(point.value());
            point.assign(cid);
        }
        population.changed()
    }

    /// Update step: move every centroid to the mean of its members.
    ///
    /// Returns the number of empty clusters that were reseeded.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        population: &Population,
        rng: &mut R,
    ) -> Result<usize> {
        let k = self.centroids.nrows();
        let (mut centroids, counts) = partial_centroids(population, k);
        let mut reseeded = 0usize;
        for (cid, &count) in counts.iter().enumerate() {
            if count > 0 {
                continue;
            }
            match self.config.empty_cluster {
                EmptyClusterPolicy::Fail => {
                    return Err(ClusterError::EmptyCluster { cluster: cid });
                }
                EmptyClusterPolicy::Reseed => {
                    let idx = rng.gen_range(0..population.len());
                    let seed = population.points()[idx].value();
                    tracing::warn!(cluster = cid, sample = idx, "reseeding empty cluster");
                    for (slot, &value) in centroids.row_mut(cid).iter_mut().zip(seed) {
                        *slot = value;
                    }
                    reseeded += 1;
                }
            }
        }
        self.centroids = centroids;
        Ok(reseeded)
    }

    /// Run assignment/update rounds until the delta drops to `min_delta`.
    ///
    /// A round that had to reseed an empty cluster never counts as converged.
    /// Hitting `max_iter` is not an error: the population keeps its latest
    /// labels and the outcome reports `converged == false`.
    pub fn fit<R, O>(
        &mut self,
        population: &mut Population,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<FitOutcome>
    where
        R: Rng + ?Sized,
        O: Observer + ?Sized,
    {
        if population.is_empty() {
            return Err(ClusterError::EmptyPopulation);
        }
        if self.centroids.ncols() != population.dim() {
            return Err(ClusterError::DimensionMismatch {
                expected: population.dim(),
                found: self.centroids.ncols(),
            });
        }

        let mut deltas = Vec::new();
        let mut iterations = 0usize;

        let converged = loop {
            iterations += 1;

            let delta = self.assign(population);
            deltas.push(delta);
            let reseeded = self.update(population, rng)?;

            tracing::debug!(
                iteration = iterations,
                delta,
                reseeded,
                "kmeans round complete"
            );
            observer.observe(&Snapshot {
                engine: EngineKind::KMeans,
                iteration: iterations,
                population: &*population,
                centroids: Some(&self.centroids),
                delta: Some(delta),
                objective: None,
            });

            if delta <= self.config.min_delta && reseeded == 0 {
                break true;
            }
            if iterations >= self.config.max_iter {
                break false;
            }
        };

        let sizes = cluster_sizes(population, self.centroids.nrows());
        let converged = converged && sizes.iter().all(|&size| size > 0);
        if !converged {
            tracing::warn!(
                iterations,
                last_delta = deltas.last().copied().unwrap_or_default(),
                min_delta = self.config.min_delta,
                "kmeans did not converge"
            );
        }

        let inertia = centroid::inertia(population, &self.centroids);
        Ok(FitOutcome {
            iterations,
            converged,
            deltas,
            cluster_sizes: sizes,
            inertia,
        })
    }
}

/// Result of a single k-means run.
#[derive(Debug, Clone, Serialize)]
pub struct FitOutcome {
    /// Number of completed rounds.
    pub iterations: usize,
    /// Whether the delta reached `min_delta` before `max_iter`, with every
    /// cluster non-empty.
    pub converged: bool,
    /// Delta of every round, in order.
    pub deltas: Vec<usize>,
    /// Number of points assigned to each centroid.
    pub cluster_sizes: Vec<usize>,
    /// Sum of squared distances to each centroid.
    pub inertia: f64,
}

/// Final model + diagnostics returned from [`partition`].
#[derive(Debug, Clone)]
pub struct KMeansRun<M = Euclidean> {
    pub model: KMeans<M>,
    pub outcome: FitOutcome,
}

/// Partition `population` into `config.k` clusters with Euclidean k-means.
pub fn partition<R: Rng + ?Sized>(
    population: &mut Population,
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<KMeansRun> {
    partition_with(population, config, Euclidean, rng, &mut Silent)
}

/// [`partition`] with a custom metric and a per-round observer.
pub fn partition_with<M, R, O>(
    population: &mut Population,
    config: &KMeansConfig,
    metric: M,
    rng: &mut R,
    observer: &mut O,
) -> Result<KMeansRun<M>>
where
    M: Metric,
    R: Rng + ?Sized,
    O: Observer + ?Sized,
{
    config.validate(population)?;
    let centroids = initial_centroids(population, config.k, config.init, rng)?;
    let mut model = KMeans::with_metric(config.clone(), centroids, metric);
    let outcome = model.fit(population, rng, observer)?;
    tracing::info!(
        k = config.k,
        iterations = outcome.iterations,
        converged = outcome.converged,
        inertia = outcome.inertia,
        "kmeans partition finished"
    );
    Ok(KMeansRun { model, outcome })
}

/// Choose `k` starting centroids from the population's values.
pub fn initial_centroids<R: Rng + ?Sized>(
    population: &Population,
    k: usize,
    init: InitStrategy,
    rng: &mut R,
) -> Result<DataMatrix> {
    if population.is_empty() {
        return Err(ClusterError::EmptyPopulation);
    }
    match init {
        InitStrategy::Sample => Ok(sample_init(population, k, rng)),
        InitStrategy::KMeansPlusPlus => kmeans_pp_init(population, k, rng),
    }
}

fn sample_init<R: Rng + ?Sized>(population: &Population, k: usize, rng: &mut R) -> DataMatrix {
    let points = population.points();
    let mut centroids = Array2::zeros((k, population.dim()));
    for mut row in centroids.rows_mut() {
        let pick = &points[rng.gen_range(0..points.len())];
        for (slot, &value) in row.iter_mut().zip(pick.value()) {
            *slot = value;
        }
    }
    centroids
}

fn kmeans_pp_init<R: Rng + ?Sized>(
    population: &Population,
    k: usize,
    rng: &mut R,
) -> Result<DataMatrix> {
    let points = population.points();
    let n = points.len();
    if k > n {
        return Err(ClusterError::InvalidConfig(format!(
            "initialisation requires k <= n (k={k}, n={n})"
        )));
    }
    let mut chosen = Vec::with_capacity(k);
    if k > 0 {
        chosen.push(rng.gen_range(0..n));
    }

    let mut distances: Vec<f64> = match chosen.first() {
        Some(&first) => points
            .iter()
            .map(|p| squared_distance(p.value(), points[first].value()))
            .collect(),
        None => Vec::new(),
    };

    while chosen.len() < k {
        let sum: f64 = distances.iter().sum();
        let mut pick = rng.gen::<f64>() * sum;
        let mut idx = 0usize;
        while idx + 1 < n && pick > distances[idx] {
            pick -= distances[idx];
            idx += 1;
        }
        chosen.push(idx);

        let centre = points[idx].value();
        for (slot, point) in distances.iter_mut().zip(points) {
            let d = squared_distance(point.value(), centre);
            if d < *slot {
                *slot = d;
            }
        }
    }

    let mut centroids = Array2::zeros((k, population.dim()));
    for (mut row, &idx) in centroids.rows_mut().into_iter().zip(&chosen) {
        for (slot, &value) in row.iter_mut().zip(points[idx].value()) {
            *slot = value;
        }
    }
    Ok(centroids)
}
