//! # furrow
//!
//! Two families of in-memory analytics over fixed-schema tabular data:
//!
//! - **Classification**: rows are hashed into sparse feature vectors
//!   ([`encode`]), an online logistic model learns from them one example at a
//!   time ([`classify`]), and [`metrics`] reports AUC, confusion, and entropy.
//! - **Clustering**: dense points are seeded (canopy, random, k-means++) and
//!   refined with K-means or Fuzzy K-means under a pluggable distance
//!   measure ([`cluster`]).
//!
//! [`pipeline`] strings the pieces together for callers that only have a
//! header and string rows.
//!
//! The `parallel` feature runs the clustering assignment step on rayon. The
//! `serde` feature derives `Serialize`/`Deserialize` for configs, models, and
//! sparse vectors.

#![forbid(unsafe_code)]

pub mod classify;
pub mod cluster;
pub mod encode;
/// Error types used across `furrow`.
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod vector;

pub use classify::{LogisticConfig, OnlineLogisticModel};
pub use cluster::{
    CanopySeeder, ClusterFit, Clustering, DistanceMeasure, FuzzyKMeans, KMeans, Seeding,
    SoftClustering,
};
pub use encode::{FeatureEncoder, FieldKind, FieldSpec, TargetSpec};
pub use error::{Error, ErrorKind, Result};
pub use metrics::Evaluator;
pub use pipeline::{cluster, evaluate, rows_to_points, train, ClusterConfig, TrainConfig, TrainedModel};
pub use vector::SparseVector;
