//! Centroid clustering over dense points.
//!
//! ## Pipeline
//!
//! 1. **Seed**: pick starting centers ([`Seeding`]): uniform random points,
//!    k-means++, explicit centers, or a [`CanopySeeder`] pass that also picks k
//! 2. **Refine**: iterate [`KMeans`] (hard) or [`FuzzyKMeans`] (soft) until
//!    no center moves more than the convergence delta, or the iteration cap
//! 3. **Assign**: every point gets a cluster id and a weight, computed once
//!    against the final centers ([`ClusterFit`])
//!
//! ## Hard vs Soft Clustering
//!
//! **Hard clustering** assigns each point to exactly one cluster (weight 1).
//!
//! **Soft clustering** gives each point a membership in every cluster; the
//! memberships of a point sum to 1. [`FuzzyKMeans`] keeps the full membership
//! matrix and reports the most likely cluster as the assignment.
//!
//! ## Distance Measures
//!
//! Every stage compares points through one [`DistanceMeasure`], squared
//! Euclidean unless configured otherwise. [`measure_from_name`] resolves a
//! configured name.
//!
//! ## Usage
//!
//! ```rust
//! use furrow::cluster::{Clustering, FuzzyKMeans, KMeans, Seeding, SoftClustering};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 10.0],
//!     vec![10.0, 11.0],
//! ];
//!
//! // Hard clustering with K-means
//! let fit = KMeans::new(2).with_seed(42).fit(&data).unwrap();
//! let labels = fit.labels();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! // Canopy seeding decides k
//! let labels = KMeans::new(0)
//!     .with_seeding(Seeding::Canopy { t1: 3.0, t2: 2.0 })
//!     .fit_predict(&data)
//!     .unwrap();
//! assert_eq!(labels, vec![0, 0, 1, 1]);
//!
//! // Soft clustering with Fuzzy K-means
//! let u = FuzzyKMeans::new(2)
//!     .with_seed(42)
//!     .fit_predict_proba(&data)
//!     .unwrap();
//! assert!((u[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

mod canopy;
mod centroid;
mod distance;
mod fuzzy;
mod kmeans;
mod seed;
mod traits;

pub use canopy::{Canopy, CanopySeeder};
pub use centroid::{Assignment, Cluster, ClusterFit, IterationStats};
pub use distance::{
    default_measure, measure_from_name, measure_names, Chebyshev, Cosine, DistanceMeasure,
    Euclidean, Manhattan, SquaredEuclidean, Tanimoto,
};
pub use fuzzy::{memberships, FuzzyKMeans};
pub use kmeans::KMeans;
pub use seed::Seeding;
pub use traits::{Clustering, SoftClustering};
