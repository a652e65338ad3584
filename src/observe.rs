//! Read-only snapshots handed to collaborators between engine iterations.
//!
//! Plotting, animation or progress reporting live outside the crate; they
//! plug in through [`Observer`] and see the population exactly as the engine
//! left it after each round.

use serde::Serialize;

use crate::point::Population;
use crate::DataMatrix;

/// Which engine produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    KMeans,
    QtClust,
    HillClimb,
}

/// State of a run after one iteration.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub engine: EngineKind,
    /// 1-based round (k-means) or sweep (hill-climbing) counter.
    pub iteration: usize,
    pub population: &'a Population,
    /// Centroids after the update step, when the engine keeps them.
    pub centroids: Option<&'a DataMatrix>,
    /// Points whose label changed during this iteration.
    pub delta: Option<usize>,
    /// Best objective value, for objective-driven engines.
    pub objective: Option<f64>,
}

/// Receives a snapshot after every iteration of a run.
pub trait Observer {
    fn observe(&mut self, snapshot: &Snapshot<'_>);
}

/// Observer that ignores every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Observer for Silent {
    fn observe(&mut self, _snapshot: &Snapshot<'_>) {}
}

impl<F> Observer for F
where
    F: FnMut(&Snapshot<'_>),
{
    fn observe(&mut self, snapshot: &Snapshot<'_>) {
        self(snapshot)
    }
}
