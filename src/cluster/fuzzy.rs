//! Fuzzy K-means clustering.
//!
//! Fuzzy K-means provides **soft clustering**: every point belongs to every
//! cluster with a membership in [0, 1], and the memberships of a point sum
//! to 1.
//!
//! # Memberships
//!
//! With `dᵢⱼ` the distance from point i to center j and fuzziness `m > 1`:
//!
//! ```text
//! uᵢⱼ = (1/dᵢⱼ)^(1/(m-1)) / Σₖ (1/dᵢₖ)^(1/(m-1))
//! ```
//!
//! A point sitting exactly on a center has membership 1 there and 0
//! elsewhere (the lowest such center wins when several coincide).
//! Memberships are computed in log space so that tiny distances and large
//! exponents do not overflow.
//!
//! # Update
//!
//! Each center becomes the weighted mean of all points with weights `uᵢⱼᵐ`.
//! A center whose total weight is 0 keeps its position. The convergence test
//! and iteration cap are shared with [`KMeans`](super::KMeans).
//!
//! # Fuzziness
//!
//! As m → 1 the memberships harden toward K-means; large m spreads them
//! toward uniform. m ≤ 1 is rejected.

use super::centroid::{
    into_clusters, map_points, refine, to_matrix, Assignment, ClusterFit, LoopParams, Refine,
};
use super::distance::{default_measure, DistanceMeasure};
use super::seed::{prepare, Seeding};
use super::traits::{Clustering, SoftClustering};
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::sync::Arc;

/// Fuzzy K-means clustering.
#[derive(Debug, Clone)]
pub struct FuzzyKMeans {
    /// Number of clusters.
    k: usize,
    /// Fuzziness exponent `m`.
    fuzziness: f64,
    /// Maximum iterations.
    max_iter: usize,
    /// Largest center movement still counted as converged.
    convergence_delta: f64,
    /// Random seed.
    seed: Option<u64>,
    measure: Arc<dyn DistanceMeasure>,
    seeding: Seeding,
}

impl FuzzyKMeans {
    /// Create a new Fuzzy K-means clusterer with fuzziness 2.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            fuzziness: 2.0,
            max_iter: 100,
            convergence_delta: 1e-4,
            seed: None,
            measure: default_measure(),
            seeding: Seeding::default(),
        }
    }

    /// Set the fuzziness exponent (must be > 1).
    pub fn with_fuzziness(mut self, m: f64) -> Self {
        self.fuzziness = m;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence delta.
    pub fn with_convergence_delta(mut self, delta: f64) -> Self {
        self.convergence_delta = delta;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the distance measure.
    pub fn with_measure(mut self, measure: Arc<dyn DistanceMeasure>) -> Self {
        self.measure = measure;
        self
    }

    /// Set the seeding strategy.
    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Fuzziness exponent.
    pub fn fuzziness(&self) -> f64 {
        self.fuzziness
    }

    /// Cluster `data`; the fit carries the full membership matrix.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<ClusterFit> {
        check_fuzziness(self.fuzziness)?;
        let params = LoopParams {
            max_iter: self.max_iter,
            convergence_delta: self.convergence_delta,
        };
        params.validate()?;
        let (data, centers) = prepare(data, &self.seeding, self.k, &self.measure, self.seed)?;

        let variant = Soft {
            fuzziness: self.fuzziness,
        };
        let refined = refine(&variant, data.view(), centers, self.measure.as_ref(), params);

        let u = membership_matrix(
            data.view(),
            &refined.centers,
            self.measure.as_ref(),
            self.fuzziness,
        );
        let assignments = u
            .rows()
            .into_iter()
            .map(|row| {
                let (cluster, weight) = argmax(row);
                Assignment { cluster, weight }
            })
            .collect();

        Ok(ClusterFit {
            clusters: into_clusters(&refined, &self.measure),
            assignments,
            memberships: Some(u),
            iterations: refined.iterations,
            converged: refined.converged,
            history: refined.history,
        })
    }
}

/// Memberships of `point` in each of `centers`.
///
/// Scores new points against a fitted model's centers. The result has one
/// entry per center and sums to 1.
///
/// ```rust
/// use furrow::cluster::{memberships, SquaredEuclidean};
///
/// let centers = vec![vec![0.0], vec![4.0]];
/// let u = memberships(&[1.0], &centers, &SquaredEuclidean, 2.0).unwrap();
/// // d = (1, 9) -> (1, 1/9) normalized
/// assert!((u[0] - 0.9).abs() < 1e-12);
/// assert!((u[1] - 0.1).abs() < 1e-12);
/// ```
pub fn memberships(
    point: &[f64],
    centers: &[Vec<f64>],
    measure: &dyn DistanceMeasure,
    fuzziness: f64,
) -> Result<Vec<f64>> {
    check_fuzziness(fuzziness)?;
    let centers = to_matrix(centers)?;
    if point.len() != centers.ncols() {
        return Err(Error::DimensionMismatch {
            expected: centers.ncols(),
            found: point.len(),
        });
    }
    Ok(point_memberships(
        ArrayView1::from(point),
        &centers,
        measure,
        fuzziness,
    ))
}

fn check_fuzziness(m: f64) -> Result<()> {
    if !(m.is_finite() && m > 1.0) {
        return Err(Error::invalid("fuzziness", "must be finite and > 1"));
    }
    Ok(())
}

fn point_memberships(
    point: ArrayView1<'_, f64>,
    centers: &Array2<f64>,
    measure: &dyn DistanceMeasure,
    m: f64,
) -> Vec<f64> {
    let distances: Vec<f64> = centers
        .rows()
        .into_iter()
        .map(|c| measure.distance(point, c))
        .collect();

    let mut u = vec![0.0; distances.len()];
    if let Some(j) = distances.iter().position(|&d| d == 0.0) {
        u[j] = 1.0;
        return u;
    }

    // log uᵢⱼ = -ln(dᵢⱼ) / (m - 1), then a stable softmax
    let exponent = 1.0 / (m - 1.0);
    let logs: Vec<f64> = distances.iter().map(|d| -d.ln() * exponent).collect();
    let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for (uj, l) in u.iter_mut().zip(&logs) {
        *uj = (l - max).exp();
        total += *uj;
    }
    for uj in &mut u {
        *uj /= total;
    }
    u
}

fn membership_matrix(
    data: ArrayView2<'_, f64>,
    centers: &Array2<f64>,
    measure: &dyn DistanceMeasure,
    m: f64,
) -> Array2<f64> {
    let rows = map_points(data.nrows(), |i| {
        point_memberships(data.row(i), centers, measure, m)
    });
    let mut u = Array2::zeros((data.nrows(), centers.nrows()));
    for (mut dst, src) in u.rows_mut().into_iter().zip(rows) {
        dst.assign(&ArrayView1::from(src.as_slice()));
    }
    u
}

/// Largest entry and its index; ties go to the lowest index.
fn argmax(row: ArrayView1<'_, f64>) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (j, &v) in row.iter().enumerate() {
        if v > best.1 {
            best = (j, v);
        }
    }
    best
}

struct Soft {
    fuzziness: f64,
}

impl Refine for Soft {
    fn update(
        &self,
        data: ArrayView2<'_, f64>,
        centers: &Array2<f64>,
        measure: &dyn DistanceMeasure,
    ) -> (Array2<f64>, Vec<f64>) {
        let u = membership_matrix(data, centers, measure, self.fuzziness);

        let mut sums = Array2::<f64>::zeros(centers.dim());
        let mut weights = vec![0.0; centers.nrows()];
        let mut mass = vec![0.0; centers.nrows()];
        for (point, row) in data.rows().into_iter().zip(u.rows()) {
            for (j, &uij) in row.iter().enumerate() {
                let w = uij.powf(self.fuzziness);
                if w > 0.0 {
                    sums.row_mut(j).scaled_add(w, &point);
                    weights[j] += w;
                }
                mass[j] += uij;
            }
        }

        for (j, mut row) in sums.rows_mut().into_iter().enumerate() {
            if weights[j] > 0.0 {
                row /= weights[j];
            } else {
                row.assign(&centers.row(j));
            }
        }
        (sums, mass)
    }
}

impl Clustering for FuzzyKMeans {
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels())
    }

    fn n_clusters(&self) -> usize {
        match &self.seeding {
            Seeding::Centers(c) => c.len(),
            _ => self.k,
        }
    }
}

impl SoftClustering for FuzzyKMeans {
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let fit = self.fit(data)?;
        Ok(fit
            .memberships
            .map(|u| u.rows().into_iter().map(|r| r.to_vec()).collect())
            .unwrap_or_default())
    }
}
