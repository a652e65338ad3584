//! Greedy linkage growth shared by QT-Clust and the hill-climbing partitioner.
//!
//! Starting from a seed, the group repeatedly absorbs the candidate that is
//! best under the chosen [`Linkage`] criterion:
//!
//! | Linkage | Key minimised | Used by |
//! |---------|---------------|---------|
//! | Complete | farthest distance to any member (resulting diameter) | QT-Clust |
//! | Single | nearest distance to any member | hill-climbing groups |
//!
//! Growth stops according to a [`StopRule`]: either once the best candidate
//! would push the diameter to or past a threshold, or once a member count is
//! reached. Both distances of every candidate are tracked incrementally, so a
//! full growth costs O(n²) metric evaluations.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::distance::Metric;
use crate::error::{ClusterError, Result};

/// Criterion used to pick the next member of a growing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Linkage {
    /// Minimise the resulting maximum pairwise distance.
    #[default]
    Complete,
    /// Minimise the distance to the closest member.
    Single,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Complete => write!(f, "complete"),
            Linkage::Single => write!(f, "single"),
        }
    }
}

impl std::str::FromStr for Linkage {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "single" => Ok(Self::Single),
            other => Err(ClusterError::InvalidConfig(format!(
                "unsupported linkage '{other}'"
            ))),
        }
    }
}

/// When a growing group stops absorbing candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopRule {
    /// Accept a candidate only while the resulting diameter stays strictly
    /// below the threshold.
    Threshold(f64),
    /// Absorb at most this many points besides the seed.
    Count(usize),
}

/// A grown group: member indices in absorption order (seed first) and the
/// largest pairwise distance among them.
#[derive(Debug, Clone, PartialEq)]
pub struct Growth {
    pub members: Vec<usize>,
    pub diameter: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    nearest: f64,
    farthest: f64,
}

impl Candidate {
    fn key(&self, linkage: Linkage) -> f64 {
        match linkage {
            Linkage::Complete => self.farthest,
            Linkage::Single => self.nearest,
        }
    }
}

/// Grow a group around `values[seed]` from the other entries of `values`.
///
/// Ties between candidates go to the one appearing first in `values`.
///
/// # Panics
///
/// Panics if `seed` is out of bounds.
pub fn grow<M: Metric + ?Sized>(
    values: &[&[f64]],
    seed: usize,
    linkage: Linkage,
    stop: StopRule,
    metric: &M,
) -> Growth {
    let origin = values[seed];
    let mut pool: Vec<Candidate> = values
        .iter()
        .enumerate()
        .filter(|&(idx, _)| idx != seed)
        .map(|(index, value)| {
            let d = metric.measure(origin, value);
            Candidate {
                index,
                nearest: d,
                farthest: d,
            }
        })
        .collect();

    let limit = match stop {
        StopRule::Count(count) => count,
        StopRule::Threshold(_) => usize::MAX,
    };
    let mut members = vec![seed];
    let mut diameter = 0.0f64;

    while members.len() - 1 < limit {
        let Some(pos) = best_candidate(&pool, linkage) else {
            break;
        };
        let resulting = diameter.max(pool[pos].farthest);
        if let StopRule::Threshold(threshold) = stop {
            if resulting.partial_cmp(&threshold) != Some(Ordering::Less) {
                break;
            }
        }

        let chosen = pool.remove(pos);
        diameter = resulting;
        members.push(chosen.index);

        let joined = values[chosen.index];
        for candidate in pool.iter_mut() {
            let d = metric.measure(joined, values[candidate.index]);
            candidate.nearest = candidate.nearest.min(d);
            candidate.farthest = candidate.farthest.max(d);
        }
    }

    Growth { members, diameter }
}

fn best_candidate(pool: &[Candidate], linkage: Linkage) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (pos, candidate) in pool.iter().enumerate() {
        let key = candidate.key(linkage);
        if best.map_or(true, |(_, best_key)| key < best_key) {
            best = Some((pos, key));
        }
    }
    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;

    fn line(coords: &[f64]) -> Vec<Vec<f64>> {
        coords.iter().map(|&x| vec![x]).collect()
    }

    fn views(values: &[Vec<f64>]) -> Vec<&[f64]> {
        values.iter().map(Vec::as_slice).collect()
    }

    #[test]
    fn threshold_growth_minimises_diameter() {
        let values = line(&[0.0, 1.0, -1.5, 10.0]);
        let growth = grow(
            &views(&values),
            0,
            Linkage::Complete,
            StopRule::Threshold(3.0),
            &Euclidean,
        );
        // 1.0 joins first (diameter 1), then -1.5 would give 2.5 < 3.
        assert_eq!(growth.members, vec![0, 1, 2]);
        assert_eq!(growth.diameter, 2.5);
    }

    #[test]
    fn threshold_is_strict() {
        let values = line(&[0.0, 2.0]);
        let growth = grow(
            &views(&values),
            0,
            Linkage::Complete,
            StopRule::Threshold(2.0),
            &Euclidean,
        );
        assert_eq!(growth.members, vec![0]);
        assert_eq!(growth.diameter, 0.0);
    }

    #[test]
    fn complete_and_single_linkage_diverge() {
        // After (1, 0) joins, (2, 0) is nearest to a member while
        // (0.5, 1.2) keeps the diameter smaller.
        let values = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![0.5, 1.2],
        ];
        let values = views(&values);
        let complete = grow(&values, 0, Linkage::Complete, StopRule::Count(2), &Euclidean);
        let single = grow(&values, 0, Linkage::Single, StopRule::Count(2), &Euclidean);
        assert_eq!(complete.members, vec![0, 1, 3]);
        assert_eq!(single.members, vec![0, 1, 2]);
        assert!((complete.diameter - 1.3).abs() < 1e-9);
        assert!((single.diameter - 2.0).abs() < 1e-12);
    }

    #[test]
    fn count_is_bounded_by_available_points() {
        let values = line(&[0.0, 5.0, 9.0]);
        let growth = grow(
            &views(&values),
            1,
            Linkage::Single,
            StopRule::Count(10),
            &Euclidean,
        );
        assert_eq!(growth.members.len(), 3);
        assert_eq!(growth.members[0], 1);
    }

    #[test]
    fn ties_resolve_to_first_candidate() {
        let values = line(&[0.0, -1.0, 1.0]);
        let growth = grow(
            &views(&values),
            0,
            Linkage::Complete,
            StopRule::Count(1),
            &Euclidean,
        );
        assert_eq!(growth.members, vec![0, 1]);
    }
}
