//! Canopy seeding.
//!
//! A cheap, single pass that proposes initial centers for an iterative
//! clusterer without knowing k in advance.
//!
//! # Two Thresholds
//!
//! - `t1` (loose): a point within `t1` of a canopy's seed joins that canopy.
//!   A point may join several canopies.
//! - `t2` (tight, `t2 <= t1`): a point within `t2` of any existing seed is
//!   considered covered and never starts a canopy of its own.
//!
//! Any other point starts a new canopy seeded at itself.
//!
//! # Centers
//!
//! During the pass, distances are measured against each canopy's fixed seed
//! point. After the pass, every canopy's center is the mean of its members.
//!
//! # Complexity
//!
//! O(n × c) distance evaluations for `c` canopies. With `t1 = t2 = 0`, every
//! distinct point is its own canopy.

use super::centroid::{nearest, to_matrix, Cluster};
use super::distance::{default_measure, DistanceMeasure};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use std::sync::Arc;
use tracing::debug;

/// A canopy: seed point, members, and the mean of the members.
#[derive(Debug, Clone, PartialEq)]
pub struct Canopy {
    /// Canopy id, in creation order.
    pub id: usize,
    /// Index of the point that created the canopy.
    pub seed: usize,
    /// Indices of member points (including the seed), ascending.
    pub members: Vec<usize>,
    /// Mean of the members.
    pub center: Array1<f64>,
}

/// Single-pass canopy generator.
#[derive(Debug, Clone)]
pub struct CanopySeeder {
    t1: f64,
    t2: f64,
    measure: Arc<dyn DistanceMeasure>,
}

impl CanopySeeder {
    /// Seeder with loose threshold `t1` and tight threshold `t2`.
    pub fn new(t1: f64, t2: f64) -> Self {
        Self {
            t1,
            t2,
            measure: default_measure(),
        }
    }

    /// Set the distance measure.
    pub fn with_measure(mut self, measure: Arc<dyn DistanceMeasure>) -> Self {
        self.measure = measure;
        self
    }

    /// Loose threshold.
    pub fn t1(&self) -> f64 {
        self.t1
    }

    /// Tight threshold.
    pub fn t2(&self) -> f64 {
        self.t2
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.t1.is_finite() && self.t2.is_finite()) {
            return Err(Error::invalid("t1/t2", "thresholds must be finite"));
        }
        if self.t2 < 0.0 {
            return Err(Error::invalid("t2", "must be >= 0"));
        }
        if self.t2 > self.t1 {
            return Err(Error::invalid("t2", "must not exceed t1"));
        }
        Ok(())
    }

    /// Run the canopy pass over `data`.
    pub fn seed(&self, data: &[Vec<f64>]) -> Result<Vec<Canopy>> {
        self.validate()?;
        let data = to_matrix(data)?;
        Ok(self.seed_matrix(&data))
    }

    pub(crate) fn seed_matrix(&self, data: &Array2<f64>) -> Vec<Canopy> {
        let mut seeds: Vec<usize> = Vec::new();
        let mut members: Vec<Vec<usize>> = Vec::new();

        for (i, point) in data.rows().into_iter().enumerate() {
            let mut covered = false;
            for (c, &s) in seeds.iter().enumerate() {
                let d = self.measure.distance(point, data.row(s));
                if d <= self.t1 {
                    members[c].push(i);
                }
                covered |= d <= self.t2;
            }
            if !covered {
                seeds.push(i);
                members.push(vec![i]);
            }
        }
        debug!(points = data.nrows(), canopies = seeds.len(), "canopy pass");

        seeds
            .into_iter()
            .zip(members)
            .enumerate()
            .map(|(id, (seed, members))| {
                let mut center = Array1::zeros(data.ncols());
                for &m in &members {
                    center += &data.row(m);
                }
                center /= members.len() as f64;
                Canopy {
                    id,
                    seed,
                    members,
                    center,
                }
            })
            .collect()
    }

    /// Canopies as initial clusters for a centroid clusterer.
    pub fn seed_clusters(&self, data: &[Vec<f64>]) -> Result<Vec<Cluster>> {
        Ok(self
            .seed(data)?
            .into_iter()
            .map(|c| Cluster {
                id: c.id,
                observations: c.members.len() as f64,
                center: c.center,
                measure: Arc::clone(&self.measure),
                converged: false,
            })
            .collect())
    }

    /// Run the pass, then assign every point to the canopy whose center is nearest.
    pub fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        self.validate()?;
        let matrix = to_matrix(data)?;
        let canopies = self.seed_matrix(&matrix);
        let mut centers = Array2::zeros((canopies.len(), matrix.ncols()));
        for (mut row, c) in centers.rows_mut().into_iter().zip(&canopies) {
            row.assign(&c.center);
        }
        Ok(matrix
            .rows()
            .into_iter()
            .map(|p| nearest(p, &centers, self.measure.as_ref()).0)
            .collect())
    }
}
