//! Evaluation metrics.
//!
//! - [`Evaluator`]: binary classifier quality from `(label, score)` pairs
//!   (AUC, confusion matrix, entropy matrix).
//! - [`direct_accuracy`], [`purity`], [`nmi`]: how well a clustering recovers
//!   known class labels.
//!
//! # Example
//!
//! ```rust
//! use furrow::metrics::Evaluator;
//!
//! let mut eval = Evaluator::new();
//! for (label, score) in [(0, 0.1), (0, 0.4), (1, 0.35), (1, 0.8)] {
//!     eval.add(label, score).unwrap();
//! }
//! assert_eq!(eval.auc().unwrap(), 0.75);
//! assert_eq!(eval.confusion(), [[2, 1], [0, 1]]);
//! ```

mod agreement;
mod auc;

pub use agreement::{direct_accuracy, nmi, purity, ClusteringAccuracy};
pub use auc::{Evaluator, ScorePoint};
