//! The refinement loop shared by K-means and Fuzzy K-means.
//!
//! Each iteration computes new centers from the current ones (the variant
//! decides how), then measures how far every center moved under the configured
//! [`DistanceMeasure`]. The run stops when the largest move is at most
//! `convergence_delta`, or after `max_iter` iterations.
//!
//! The final point assignment is computed once, against the final centers.

use super::distance::DistanceMeasure;
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A cluster: id, center, and the measure used to compare points to it.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// Cluster id, `0..k`.
    pub id: usize,
    /// Current center.
    pub center: Array1<f64>,
    /// Distance measure.
    pub measure: Arc<dyn DistanceMeasure>,
    /// Total membership weight observed in the last update (point count for K-means).
    pub observations: f64,
    /// Whether the last update moved this center by at most the convergence delta.
    pub converged: bool,
}

impl Cluster {
    /// Distance from `point` to this center.
    pub fn distance_to(&self, point: ArrayView1<'_, f64>) -> f64 {
        self.measure.distance(point, self.center.view())
    }
}

/// The cluster a point ended up in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    /// Cluster id.
    pub cluster: usize,
    /// Membership weight: 1 for hard assignment, the maximum membership for soft.
    pub weight: f64,
}

/// Movement summary of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationStats {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Largest center movement.
    pub max_shift: f64,
}

/// Result of a centroid clustering run.
#[derive(Debug, Clone)]
pub struct ClusterFit {
    /// Final clusters, indexed by id.
    pub clusters: Vec<Cluster>,
    /// One assignment per input point.
    pub assignments: Vec<Assignment>,
    /// Full `n × k` membership matrix (soft clustering only).
    pub memberships: Option<Array2<f64>>,
    /// Iterations run.
    pub iterations: usize,
    /// Whether the convergence test passed before the iteration cap.
    pub converged: bool,
    /// Per-iteration movement.
    pub history: Vec<IterationStats>,
}

impl ClusterFit {
    /// Cluster id per point.
    pub fn labels(&self) -> Vec<usize> {
        self.assignments.iter().map(|a| a.cluster).collect()
    }

    /// Centers stacked as a `k × d` matrix.
    pub fn centers(&self) -> Array2<f64> {
        let d = self.clusters.first().map_or(0, |c| c.center.len());
        let mut out = Array2::zeros((self.clusters.len(), d));
        for (mut row, c) in out.rows_mut().into_iter().zip(&self.clusters) {
            row.assign(&c.center);
        }
        out
    }

    /// Nearest cluster for a new point.
    pub fn predict(&self, point: &[f64]) -> Result<usize> {
        let first = self.clusters.first().ok_or(Error::EmptyInput)?;
        if point.len() != first.center.len() {
            return Err(Error::DimensionMismatch {
                expected: first.center.len(),
                found: point.len(),
            });
        }
        let view = ArrayView1::from(point);
        Ok(self
            .clusters
            .iter()
            .map(|c| (c.id, c.distance_to(view)))
            .fold((0, f64::INFINITY), |best, (id, d)| if d < best.1 { (id, d) } else { best })
            .0)
    }
}

/// One refinement variant: how new centers follow from the current ones.
pub(crate) trait Refine {
    /// New centers and the membership weight each one received.
    fn update(
        &self,
        data: ArrayView2<'_, f64>,
        centers: &Array2<f64>,
        measure: &dyn DistanceMeasure,
    ) -> (Array2<f64>, Vec<f64>);
}

/// Loop settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopParams {
    pub max_iter: usize,
    pub convergence_delta: f64,
}

impl LoopParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(Error::invalid("max_iter", "must be > 0"));
        }
        if !(self.convergence_delta.is_finite() && self.convergence_delta >= 0.0) {
            return Err(Error::invalid("convergence_delta", "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Output of [`refine`].
pub(crate) struct Refined {
    pub centers: Array2<f64>,
    pub observations: Vec<f64>,
    pub converged_per_cluster: Vec<bool>,
    pub iterations: usize,
    pub converged: bool,
    pub history: Vec<IterationStats>,
}

/// Iterate `variant` from `centers` until convergence or the cap.
pub(crate) fn refine(
    variant: &impl Refine,
    data: ArrayView2<'_, f64>,
    mut centers: Array2<f64>,
    measure: &dyn DistanceMeasure,
    params: LoopParams,
) -> Refined {
    let k = centers.nrows();
    let mut observations = vec![0.0; k];
    let mut converged_per_cluster = vec![false; k];
    let mut history = Vec::with_capacity(params.max_iter);
    let mut converged = false;

    for iteration in 1..=params.max_iter {
        let (next, weights) = variant.update(data, &centers, measure);

        let mut max_shift = 0.0f64;
        for (j, flag) in converged_per_cluster.iter_mut().enumerate() {
            let shift = measure.distance(centers.row(j), next.row(j));
            *flag = shift <= params.convergence_delta;
            max_shift = max_shift.max(shift);
        }

        centers = next;
        observations = weights;
        history.push(IterationStats {
            iteration,
            max_shift,
        });
        debug!(iteration, max_shift, "centroid iteration");

        if max_shift <= params.convergence_delta {
            converged = true;
            break;
        }
    }

    let iterations = history.len();
    if converged {
        info!(iterations, k, "centroid clustering converged");
    } else {
        warn!(
            iterations,
            k, "centroid clustering hit the iteration cap without converging"
        );
    }

    Refined {
        centers,
        observations,
        converged_per_cluster,
        iterations,
        converged,
        history,
    }
}

/// Index and distance of the nearest center. Ties go to the lowest index.
pub(crate) fn nearest(
    point: ArrayView1<'_, f64>,
    centers: &Array2<f64>,
    measure: &dyn DistanceMeasure,
) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, center) in centers.rows().into_iter().enumerate() {
        let d = measure.distance(point, center);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Evaluate `f` for every point index, on rayon when the `parallel` feature is on.
pub(crate) fn map_points<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        (0..n).into_par_iter().map(f).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..n).map(f).collect()
    }
}

/// Copy equally sized points into an `n × d` matrix.
pub(crate) fn to_matrix(data: &[Vec<f64>]) -> Result<Array2<f64>> {
    let first = data.first().ok_or(Error::EmptyInput)?;
    let n = data.len();
    let d = first.len();
    if d == 0 {
        return Err(Error::invalid("points", "points must have at least one dimension"));
    }

    let mut flat: Vec<f64> = Vec::with_capacity(n * d);
    for point in data {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
        flat.extend_from_slice(point);
    }
    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::invalid("points", e.to_string()))
}

/// Wrap final centers as clusters.
pub(crate) fn into_clusters(
    refined: &Refined,
    measure: &Arc<dyn DistanceMeasure>,
) -> Vec<Cluster> {
    refined
        .centers
        .rows()
        .into_iter()
        .enumerate()
        .map(|(id, row)| Cluster {
            id,
            center: row.to_owned(),
            measure: Arc::clone(measure),
            observations: refined.observations[id],
            converged: refined.converged_per_cluster[id],
        })
        .collect()
}
