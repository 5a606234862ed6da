//! Streaming classifiers over hashed sparse features.
//!
//! The classifier here learns one example at a time: every call to
//! [`OnlineLogisticModel::train`] applies a single gradient step and forgets
//! the example. Multiple passes are simply repeated calls over the same rows.
//!
//! ```rust
//! use furrow::classify::{LogisticConfig, OnlineLogisticModel};
//! use furrow::SparseVector;
//!
//! let mut model = OnlineLogisticModel::new(
//!     LogisticConfig::new(2, 2).with_learning_rate(0.5),
//! ).unwrap();
//!
//! let neg = SparseVector::from_dense(&[1.0, 0.0]);
//! let pos = SparseVector::from_dense(&[0.0, 1.0]);
//! for _ in 0..100 {
//!     model.train(0, &neg).unwrap();
//!     model.train(1, &pos).unwrap();
//! }
//! assert!(model.classify_scalar(&pos).unwrap() > 0.5);
//! ```

mod logistic;

pub use logistic::{sigmoid, LogisticConfig, OnlineLogisticModel};
