//! Online logistic regression trained by stochastic gradient descent.
//!
//! # The Model
//!
//! With `K` categories the model keeps `K - 1` coefficient rows. Category 0 is
//! the reference class whose score is fixed at zero:
//!
//! ```text
//! s_0 = 0,   s_c = β_c · x (+ b_c)        c = 1..K-1
//! P(c | x) = exp(s_c) / Σ_j exp(s_j)
//! ```
//!
//! For `K = 2` this is the familiar single logit: `P(1 | x) = σ(β · x + b)`.
//!
//! # The Update
//!
//! One example, one step. For each non-reference category and each **active**
//! coordinate `i` (non-zero weight `x_i`):
//!
//! ```text
//! g_c   = P(c | x) - [y = c]
//! β_c,i ← β_c,i - η (g_c x_i + λ β_c,i)
//! ```
//!
//! Coordinates absent from `x` are not touched, so a step costs
//! `O((K - 1) × nnz(x))` regardless of the hashed width. The bias slot behaves
//! like a feature that is always present with weight 1.
//!
//! # Failure Modes
//!
//! - **Unscaled inputs**: large raw values with a large rate overshoot; nothing
//!   is clamped, so pre-scale.
//! - **Order dependence**: SGD sees rows in the order given. Passes re-visit
//!   the same order; there is no shuffling.

use crate::error::{Error, Result};
use crate::vector::SparseVector;
use ndarray::Array2;

/// Hyperparameters of an [`OnlineLogisticModel`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogisticConfig {
    /// Width of the feature vectors the model accepts.
    pub num_features: usize,
    /// Number of target categories (>= 2).
    pub num_categories: usize,
    /// SGD step size.
    pub learning_rate: f64,
    /// L2 coefficient decay.
    pub lambda: f64,
    /// Keep one extra always-on coefficient per row.
    pub use_bias: bool,
}

impl LogisticConfig {
    /// Binary or multinomial model over `num_features` hashed features.
    pub fn new(num_features: usize, num_categories: usize) -> Self {
        Self {
            num_features,
            num_categories,
            learning_rate: 1e-3,
            lambda: 1e-4,
            use_bias: true,
        }
    }

    /// Set learning rate.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Set L2 decay.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Include or drop the bias term.
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_features == 0 {
            return Err(Error::invalid("features", "must be > 0"));
        }
        if self.num_categories < 2 {
            return Err(Error::invalid("categories", "need at least 2 categories"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::invalid("rate", "must be finite and > 0"));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(Error::invalid("lambda", "must be finite and >= 0"));
        }
        Ok(())
    }
}

/// Per-category coefficient vectors updated one example at a time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawLogisticModel"))]
pub struct OnlineLogisticModel {
    config: LogisticConfig,
    /// `(num_categories - 1) × (num_features + bias)`.
    beta: Array2<f64>,
    steps: u64,
}

impl OnlineLogisticModel {
    /// Create a zero-initialized model.
    pub fn new(config: LogisticConfig) -> Result<Self> {
        config.validate()?;
        let width = config.num_features + usize::from(config.use_bias);
        let beta = Array2::zeros((config.num_categories - 1, width));
        Ok(Self {
            config,
            beta,
            steps: 0,
        })
    }

    /// Model hyperparameters.
    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    /// Number of categories.
    pub fn num_categories(&self) -> usize {
        self.config.num_categories
    }

    /// Number of SGD steps applied so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether at least one update has been applied.
    pub fn is_trained(&self) -> bool {
        self.steps > 0
    }

    /// Coefficient matrix, one row per non-reference category. With a bias the
    /// last column holds it.
    pub fn coefficients(&self) -> &Array2<f64> {
        &self.beta
    }

    /// Raw linear score per category; index 0 is the reference and always 0.
    pub fn predict_scores(&self, v: &SparseVector) -> Result<Vec<f64>> {
        self.check_dim(v)?;
        let mut scores = Vec::with_capacity(self.config.num_categories);
        scores.push(0.0);
        for row in 0..self.beta.nrows() {
            scores.push(self.linear(row, v)?);
        }
        Ok(scores)
    }

    /// Probability of every category.
    pub fn classify(&self, v: &SparseVector) -> Result<Vec<f64>> {
        let mut scores = self.predict_scores(v)?;
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        for s in scores.iter_mut() {
            *s = (*s - max).exp();
            total += *s;
        }
        scores.iter_mut().for_each(|s| *s /= total);
        Ok(scores)
    }

    /// `P(category 1 | v)` for a binary model.
    pub fn classify_scalar(&self, v: &SparseVector) -> Result<f64> {
        if self.config.num_categories != 2 {
            return Err(Error::invalid(
                "categories",
                "classify_scalar requires a binary model",
            ));
        }
        self.check_dim(v)?;
        Ok(sigmoid(self.linear(0, v)?))
    }

    /// One SGD step toward `actual` on example `v`.
    pub fn train(&mut self, actual: usize, v: &SparseVector) -> Result<()> {
        self.check_label(actual)?;
        let probs = self.classify(v)?;
        let rate = self.config.learning_rate;
        let lambda = self.config.lambda;
        let decay = 1.0 - rate * lambda;
        let bias_col = self.config.num_features;

        for c in 1..self.config.num_categories {
            let target = if actual == c { 1.0 } else { 0.0 };
            let g = probs[c] - target;
            let mut row = self.beta.row_mut(c - 1);
            for (i, _) in v.active() {
                row[i] *= decay;
            }
            v.scaled_add_to(-rate * g, row.view_mut())?;
            if self.config.use_bias {
                row[bias_col] = row[bias_col] * decay - rate * g;
            }
        }
        self.steps += 1;
        Ok(())
    }

    /// `ln P(actual | v)`. Does not modify the model.
    pub fn log_likelihood(&self, actual: usize, v: &SparseVector) -> Result<f64> {
        self.check_label(actual)?;
        let scores = self.predict_scores(v)?;
        Ok(scores[actual] - logsumexp(&scores))
    }

    fn linear(&self, row: usize, v: &SparseVector) -> Result<f64> {
        let coef = self.beta.row(row);
        let mut s = v.dot_dense(coef)?;
        if self.config.use_bias {
            s += coef[self.config.num_features];
        }
        Ok(s)
    }

    fn check_dim(&self, v: &SparseVector) -> Result<()> {
        if v.dim() != self.config.num_features {
            return Err(Error::DimensionMismatch {
                expected: self.config.num_features,
                found: v.dim(),
            });
        }
        Ok(())
    }

    fn check_label(&self, label: usize) -> Result<()> {
        if label >= self.config.num_categories {
            return Err(Error::LabelOutOfRange {
                label,
                n_categories: self.config.num_categories,
            });
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawLogisticModel {
    config: LogisticConfig,
    beta: Array2<f64>,
    steps: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawLogisticModel> for OnlineLogisticModel {
    type Error = Error;

    fn try_from(raw: RawLogisticModel) -> Result<Self> {
        let mut model = Self::new(raw.config)?;
        if raw.beta.dim() != model.beta.dim() {
            return Err(Error::invalid(
                "coefficients",
                format!(
                    "shape {:?} does not match the configured {:?}",
                    raw.beta.dim(),
                    model.beta.dim()
                ),
            ));
        }
        model.beta = raw.beta;
        model.steps = raw.steps;
        Ok(model)
    }
}

/// Logistic function, evaluated without overflow for large `|z|`.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}
