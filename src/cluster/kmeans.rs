//! K-means clustering.
//!
//! Partitions points into k clusters by alternating two steps (Lloyd):
//!
//! 1. **Assign**: each point goes to its nearest center under the configured
//!    [`DistanceMeasure`] (ties go to the lowest cluster id)
//! 2. **Update**: each center becomes the mean of the points assigned to it
//!
//! The run stops once no center moves by more than `convergence_delta`
//! (measured with the same distance measure), or after `max_iter` iterations.
//!
//! A cluster that receives no points keeps its previous center.
//!
//! # Iteration Count
//!
//! Convergence is detected on the iteration whose update leaves every center
//! in place, and [`ClusterFit::iterations`] counts that confirming pass.
//! With k = 1 the first iteration already lands on the set mean and the
//! second confirms it, so a converged k = 1 run reports `iterations == 2`
//! (or 1 when the seed point was the mean).
//!
//! # Failure Modes
//!
//! - **Local optima**: Lloyd finds a local minimum only
//! - **Wrong k**: k is fixed in advance, unless canopy seeding picks it
//! - **Initialization sensitivity**: see [`Seeding`]

use super::centroid::{
    into_clusters, map_points, nearest, refine, Assignment, ClusterFit, LoopParams, Refine,
};
use super::distance::{default_measure, DistanceMeasure};
use super::seed::{prepare, Seeding};
use super::traits::Clustering;
use crate::error::Result;
use ndarray::{Array2, ArrayView2};
use std::sync::Arc;

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Largest center movement still counted as converged.
    convergence_delta: f64,
    /// Random seed.
    seed: Option<u64>,
    measure: Arc<dyn DistanceMeasure>,
    seeding: Seeding,
}

impl KMeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            convergence_delta: 1e-4,
            seed: None,
            measure: default_measure(),
            seeding: Seeding::default(),
        }
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

    /// Distance measure in use.
    pub fn measure(&self) -> &Arc<dyn DistanceMeasure> {
        &self.measure
    }

    fn params(&self) -> LoopParams {
        LoopParams {
            max_iter: self.max_iter,
            convergence_delta: self.convergence_delta,
        }
    }

    /// Cluster `data` and return the fitted clusters and assignments.
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<ClusterFit> {
        let params = self.params();
        params.validate()?;
        let (data, centers) = prepare(data, &self.seeding, self.k, &self.measure, self.seed)?;

        let refined = refine(&Lloyd, data.view(), centers, self.measure.as_ref(), params);

        let assignments = map_points(data.nrows(), |i| {
            let (cluster, _) = nearest(data.row(i), &refined.centers, self.measure.as_ref());
            Assignment {
                cluster,
                weight: 1.0,
            }
        });

        Ok(ClusterFit {
            clusters: into_clusters(&refined, &self.measure),
            assignments,
            memberships: None,
            iterations: refined.iterations,
            converged: refined.converged,
            history: refined.history,
        })
    }
}

/// Hard assignment followed by per-cluster means.
struct Lloyd;

impl Refine for Lloyd {
    fn update(
        &self,
        data: ArrayView2<'_, f64>,
        centers: &Array2<f64>,
        measure: &dyn DistanceMeasure,
    ) -> (Array2<f64>, Vec<f64>) {
        let k = centers.nrows();
        let labels = map_points(data.nrows(), |i| nearest(data.row(i), centers, measure).0);

        let mut sums = Array2::<f64>::zeros(centers.dim());
        let mut counts = vec![0.0; k];
        for (point, &label) in data.rows().into_iter().zip(&labels) {
            let mut row = sums.row_mut(label);
            row += &point;
            counts[label] += 1.0;
        }

        for (j, mut row) in sums.rows_mut().into_iter().enumerate() {
            if counts[j] > 0.0 {
                row /= counts[j];
            } else {
                row.assign(&centers.row(j));
            }
        }
        (sums, counts)
    }
}

impl Clustering for KMeans {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::Manhattan;
    use crate::error::{Error, ErrorKind};

    fn four_points() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ]
    }

    fn sorted_centers(fit: &ClusterFit) -> Vec<Vec<f64>> {
        let mut centers: Vec<Vec<f64>> = fit.clusters.iter().map(|c| c.center.to_vec()).collect();
        centers.sort_by(|a, b| a[0].total_cmp(&b[0]));
        centers
    }

    #[test]
    fn test_kmeans_two_groups() {
        for seed in 0..10 {
            let fit = KMeans::new(2).with_seed(seed).fit(&four_points()).unwrap();
            assert!(fit.converged);
            let centers = sorted_centers(&fit);
            assert!((centers[0][0] - 0.0).abs() < 1e-9 && (centers[0][1] - 0.5).abs() < 1e-9);
            assert!((centers[1][0] - 10.0).abs() < 1e-9 && (centers[1][1] - 10.5).abs() < 1e-9);

            let labels = fit.labels();
            assert_eq!(labels[0], labels[1]);
            assert_eq!(labels[2], labels[3]);
            assert_ne!(labels[0], labels[2]);
            assert!(fit.assignments.iter().all(|a| a.weight == 1.0));
        }
    }

    #[test]
    fn test_k1_first_iteration_reaches_mean() {
        let data = vec![vec![1.0, -2.0], vec![4.0, 0.0], vec![7.0, 5.0], vec![-4.0, 1.0]];
        let mean = [2.0, 1.0];

        let one = KMeans::new(1).with_seed(3).with_max_iter(1).fit(&data).unwrap();
        assert_eq!(one.iterations, 1);
        let center = one.clusters[0].center.to_vec();
        assert!((center[0] - mean[0]).abs() < 1e-12 && (center[1] - mean[1]).abs() < 1e-12);

        let full = KMeans::new(1).with_seed(3).fit(&data).unwrap();
        // No data point is the mean, so the second pass is the confirming one.
        assert!(full.converged);
        assert_eq!(full.iterations, 2);
        assert_eq!(full.history.len(), 2);
        assert_eq!(full.clusters[0].center, one.clusters[0].center);
        assert_eq!(full.clusters[0].observations, 4.0);
    }

    #[test]
    fn test_empty_cluster_keeps_center() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let fit = KMeans::new(2)
            .with_seeding(Seeding::Centers(vec![vec![0.0, 0.0], vec![100.0, 100.0]]))
            .fit(&data)
            .unwrap();
        assert_eq!(fit.clusters[1].center.to_vec(), vec![100.0, 100.0]);
        assert_eq!(fit.clusters[1].observations, 0.0);
        assert_eq!(fit.labels(), vec![0, 0, 0]);
        assert!(fit.clusters.iter().all(|c| c.center.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        // Property: every point must be assigned to exactly one cluster
        let data: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64 * 0.1, (i % 5) as f64])
            .collect();

        let labels = KMeans::new(5).with_seed(123).fit_predict(&data).unwrap();
        assert_eq!(labels.len(), data.len());
        for &label in &labels {
            assert!(label < 5, "label {} out of range", label);
        }
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        // Edge case: k = n (each point its own cluster)
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels = KMeans::new(3).with_seed(42).fit_predict(&data).unwrap();
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i * 7 % 11) as f64, (i * 3 % 5) as f64])
            .collect();
        let a = KMeans::new(3).with_seed(42).fit(&data).unwrap();
        let b = KMeans::new(3).with_seed(42).fit(&data).unwrap();
        assert_eq!(a.labels(), b.labels());
        assert_eq!(a.centers(), b.centers());
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_kmeans_scaling_invariant() {
        // Metamorphic: uniform scaling shouldn't change cluster assignments
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];
        let scaled: Vec<Vec<f64>> = data
            .iter()
            .map(|v| v.iter().map(|x| x * 100.0).collect())
            .collect();

        let labels1 = KMeans::new(2).with_seed(42).fit_predict(&data).unwrap();
        let labels2 = KMeans::new(2).with_seed(42).fit_predict(&scaled).unwrap();

        assert_eq!(labels1[0], labels1[1]);
        assert_eq!(labels2[0], labels2[1]);
        assert_eq!(labels1[2], labels1[3]);
        assert_eq!(labels2[2], labels2[3]);
        assert_ne!(labels1[0], labels1[2]);
        assert_ne!(labels2[0], labels2[2]);
    }

    #[test]
    fn test_canopy_seeding_picks_k() {
        let kmeans = KMeans::new(0).with_seeding(Seeding::Canopy { t1: 3.0, t2: 2.0 });
        let fit = kmeans.fit(&four_points()).unwrap();
        assert_eq!(fit.clusters.len(), 2);
        assert_eq!(fit.labels(), vec![0, 0, 1, 1]);
        assert_eq!(fit.iterations, 1);
    }

    #[test]
    fn test_manhattan_and_predict() {
        let fit = KMeans::new(2)
            .with_seeding(Seeding::KMeansPlusPlus)
            .with_seed(9)
            .with_measure(Arc::new(Manhattan))
            .fit(&four_points())
            .unwrap();
        let near_origin = fit.predict(&[0.2, 0.2]).unwrap();
        assert_eq!(near_origin, fit.labels()[0]);
        assert!(matches!(
            fit.predict(&[1.0]),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_kmeans_errors() {
        let empty: Vec<Vec<f64>> = vec![];
        assert!(matches!(KMeans::new(2).fit(&empty), Err(Error::EmptyInput)));

        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        assert!(matches!(
            KMeans::new(5).fit(&data),
            Err(Error::InvalidClusterCount { requested: 5, n_items: 2 })
        ));

        let ragged = vec![vec![0.0, 0.0], vec![1.0]];
        assert_eq!(KMeans::new(1).fit(&ragged).unwrap_err().kind(), ErrorKind::Dimension);

        let err = KMeans::new(1).with_convergence_delta(-1.0).fit(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(KMeans::new(1).with_max_iter(0).fit(&data).is_err());
    }
}
