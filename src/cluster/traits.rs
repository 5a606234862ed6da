//! Clustering traits.

use crate::error::Result;

/// Trait for clustering algorithms.
pub trait Clustering {
    /// Fit the model to data and return cluster assignments.
    ///
    /// Returns a vector of cluster labels, one per input point.
    fn fit_predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>>;

    /// Number of clusters the algorithm is configured for.
    ///
    /// Canopy seeding decides the count from the data, so this is only the
    /// requested k in that case.
    fn n_clusters(&self) -> usize;
}

/// Trait for soft clustering algorithms that return memberships.
pub trait SoftClustering: Clustering {
    /// Fit and return soft cluster assignments.
    ///
    /// Returns a matrix where entry \[i\]\[k\] is the membership of point i
    /// in cluster k; every row sums to 1.
    fn fit_predict_proba(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}
