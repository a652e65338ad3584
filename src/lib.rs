//! Unsupervised clustering of labeled point populations.
//!
//! The crate offers three interchangeable strategies over a shared
//! [`Population`] of [`LabeledPoint`]s:
//!
//! - [`kmeans`]: Lloyd-style centroid relocation until at most `min_delta`
//!   points change cluster in a round.
//! - [`qt`]: QT-Clust, a lazy sequence of largest threshold-bounded
//!   complete-linkage clusters drawn from a shrinking population.
//! - [`hillclimb`]: randomized labels refined by accepting neighbourhood
//!   relabelings that lower a pluggable objective.
//!
//! Every engine mutates labels in place, draws randomness only from the RNG
//! it is handed, and reports per-iteration snapshots to an optional
//! [`Observer`].
//!
//! ```rust
//! use clusterlib::{partition, KMeansConfig, Population};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut population = Population::new(vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 10.0],
//!     vec![10.0, 11.0],
//! ])
//! .unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let config = KMeansConfig {
//!     k: 2,
//!     init: clusterlib::InitStrategy::KMeansPlusPlus,
//!     ..KMeansConfig::default()
//! };
//! let run = partition(&mut population, &config, &mut rng).unwrap();
//! assert!(run.outcome.converged);
//!
//! let labels = population.labels();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

pub mod centroid;
pub mod data;
pub mod distance;
pub mod engine;
pub mod error;
pub mod hillclimb;
pub mod kmeans;
pub mod linkage;
pub mod observe;
pub mod point;
pub mod qt;

use ndarray::Array2;

/// Dense data representation used across the crate (rows = samples, columns = features).
pub type DataMatrix = Array2<f64>;

pub use centroid::{centroids, cluster_sizes, inertia};
pub use data::{generate_blobs, generate_points, DataLoader};
pub use distance::{euclidean, Euclidean, Manhattan, Metric, SquaredEuclidean};
pub use engine::{Engine, RunSummary};
pub use error::{ClusterError, Result};
pub use hillclimb::{
    info_theoretic_partition, info_theoretic_partition_with, CentroidSeparation,
    CrossInformationPotential, HillClimbConfig, HillClimbOutcome, Objective,
};
pub use kmeans::{
    initial_centroids, partition, partition_with, EmptyClusterPolicy, FitOutcome, InitStrategy,
    KMeans, KMeansConfig, KMeansRun,
};
pub use linkage::{grow, Growth, Linkage, StopRule};
pub use observe::{EngineKind, Observer, Silent, Snapshot};
pub use point::{LabeledPoint, Population};
pub use qt::{qt_clust, qt_clust_with, CandidateCluster, QtClusters, QtConfig};
