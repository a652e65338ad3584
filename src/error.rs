use thiserror::Error;

/// Error type used by operations in this crate.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// A centroid or objective was requested for a cluster with no members.
    #[error("cluster {cluster} has no members")]
    EmptyCluster { cluster: usize },
    #[error("population is empty")]
    EmptyPopulation,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Convenient alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, ClusterError>;
