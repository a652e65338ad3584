//! Quality-threshold clustering (QT-Clust, Heyer et al. 1999).
//!
//! Every pull on [`QtClusters`] grows one candidate cluster per remaining
//! point with complete linkage, keeps the largest one (the first seed wins a
//! tie), removes its members from the population and yields it. A candidate
//! accepts a point only while the resulting diameter stays strictly below
//! the threshold, so singletons are always possible and each pull removes at
//! least one point. The sequence is finite and single-pass; dropping it early
//! leaves the undiscovered points in the population.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::distance::{Euclidean, Metric};
use crate::error::{ClusterError, Result};
use crate::linkage::{grow, Growth, Linkage, StopRule};
use crate::point::{LabeledPoint, Population};

/// Settings for a QT-Clust run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct QtConfig {
    /// Exclusive upper bound on the diameter of an emitted cluster.
    pub threshold: f64,
}

impl Default for QtConfig {
    fn default() -> Self {
        Self { threshold: 1.0 }
    }
}

impl QtConfig {
    /// Reject negative, NaN or infinite thresholds.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "threshold must be a finite, non-negative number (got {})",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// A cluster produced by one outer QT step.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCluster {
    members: Vec<LabeledPoint>,
    origins: Vec<usize>,
    diameter: f64,
}

impl CandidateCluster {
    /// The seed the cluster was grown from.
    pub fn prototype(&self) -> &LabeledPoint {
        &self.members[0]
    }

    /// Members in absorption order, prototype first.
    pub fn members(&self) -> &[LabeledPoint] {
        &self.members
    }

    /// Position of every member in the population as it was when clustering
    /// started, parallel to [`members`](Self::members).
    pub fn origins(&self) -> &[usize] {
        &self.origins
    }

    /// Largest pairwise distance between members; zero for a singleton.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: a candidate holds at least its prototype.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Element-wise mean of the members.
    pub fn centroid(&self) -> Vec<f64> {
        let dim = self.prototype().value().len();
        let mut centre = vec![0.0; dim];
        for member in &self.members {
            for (acc, value) in centre.iter_mut().zip(member.value()) {
                *acc += value;
            }
        }
        let count = self.members.len() as f64;
        centre.iter_mut().for_each(|v| *v /= count);
        centre
    }

    pub fn into_members(self) -> Vec<LabeledPoint> {
        self.members
    }
}

/// Lazy sequence of QT clusters drawn from a shrinking population.
pub struct QtClusters<'a, M = Euclidean> {
    population: &'a mut Population,
    origins: Vec<usize>,
    threshold: f64,
    metric: M,
    emitted: usize,
}

impl<M: Metric> QtClusters<'_, M> {
    /// Points not yet claimed by an emitted cluster.
    pub fn remaining(&self) -> usize {
        self.population.len()
    }

    /// Number of clusters emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn largest_candidate(&self) -> Option<Growth> {
        let values = self.population.values();
        let mut best: Option<Growth> = None;
        for seed in 0..values.len() {
            let growth = grow(
                &values,
                seed,
                Linkage::Complete,
                StopRule::Threshold(self.threshold),
                &self.metric,
            );
            if best
                .as_ref()
                .map_or(true, |current| growth.members.len() > current.members.len())
            {
                let complete = growth.members.len() == values.len();
                best = Some(growth);
                if complete {
                    break;
                }
            }
        }
        best
    }
}

impl<M: Metric> Iterator for QtClusters<'_, M> {
    type Item = CandidateCluster;

    fn next(&mut self) -> Option<Self::Item> {
        let Growth { members, diameter } = self.largest_candidate()?;

        let origins: Vec<usize> = members.iter().map(|&idx| self.origins[idx]).collect();
        let mut keep = vec![true; self.origins.len()];
        for &idx in &members {
            keep[idx] = false;
        }
        self.origins = self
            .origins
            .iter()
            .zip(&keep)
            .filter_map(|(&origin, &kept)| kept.then_some(origin))
            .collect();

        let mut points = self.population.extract(&members);
        let label = self.emitted;
        for point in &mut points {
            point.assign(label);
        }
        self.emitted += 1;

        tracing::debug!(
            cluster = label,
            size = points.len(),
            diameter,
            remaining = self.population.len(),
            "qt cluster emitted"
        );

        Some(CandidateCluster {
            members: points,
            origins,
            diameter,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.population.len();
        (usize::from(remaining > 0), Some(remaining))
    }
}

impl<M: Metric> FusedIterator for QtClusters<'_, M> {}

/// Start QT-Clust over `population` with Euclidean distance.
///
/// The returned iterator drains `population`: every emitted cluster takes
/// its members out of it, labelled with the cluster's emission index.
pub fn qt_clust(threshold: f64, population: &mut Population) -> Result<QtClusters<'_>> {
    qt_clust_with(threshold, population, Euclidean)
}

/// [`qt_clust`] with a custom metric.
pub fn qt_clust_with<M: Metric>(
    threshold: f64,
    population: &mut Population,
    metric: M,
) -> Result<QtClusters<'_, M>> {
    QtConfig { threshold }.validate()?;
    if population.is_empty() {
        return Err(ClusterError::EmptyPopulation);
    }
    let origins = (0..population.len()).collect();
    Ok(QtClusters {
        population,
        origins,
        threshold,
        metric,
        emitted: 0,
    })
}
