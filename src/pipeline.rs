//! End-to-end entry points: train, evaluate, cluster.
//!
//! These glue the encoder, the classifier, the evaluator, and the
//! clusterers together the way a batch driver would, minus any file I/O:
//! callers hand over a header and an iterator of string rows.
//!
//! ```rust
//! use furrow::pipeline::{evaluate, train, TrainConfig};
//!
//! let header = ["x", "y", "label"];
//! let rows = vec![
//!     ["1", "1", "0"],
//!     ["1", "2", "0"],
//!     ["10", "10", "1"],
//!     ["10", "11", "1"],
//! ];
//!
//! let config = TrainConfig::new("label", &["x", "y"])
//!     .with_rate(0.1)
//!     .with_passes(500);
//! let model = train(&config, &header, rows.clone()).unwrap();
//!
//! let eval = evaluate(&model, &header, rows).unwrap();
//! assert_eq!(eval.auc, Ok(1.0));
//! assert!(eval.row_errors.is_empty());
//! ```

use crate::classify::{LogisticConfig, OnlineLogisticModel};
use crate::cluster::{measure_from_name, ClusterFit, FuzzyKMeans, KMeans, Seeding};
use crate::encode::{clean, FeatureEncoder, FieldSpec, TargetSpec, DEFAULT_PROBES};
use crate::error::{Error, Result};
use crate::metrics::Evaluator;
use crate::vector::SparseVector;
use tracing::{debug, info};

/// Options for [`train`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainConfig {
    /// Predictor field names, in encoding order.
    pub predictors: Vec<String>,
    /// Predictor kinds (`numeric`, `word`, `text`); one entry applies to all.
    pub kinds: Vec<String>,
    /// Target field name.
    pub target: String,
    /// Number of target categories.
    pub categories: usize,
    /// Target values to assign ids `0..n` up front.
    pub target_values: Vec<String>,
    /// Hashed feature space width.
    pub features: usize,
    /// L2 decay.
    pub lambda: f64,
    /// SGD learning rate.
    pub rate: f64,
    /// Passes over the training rows.
    pub passes: usize,
    /// Learn a bias term.
    pub use_bias: bool,
    /// Hash probes per value.
    pub probes: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            predictors: Vec::new(),
            kinds: vec!["numeric".to_owned()],
            target: String::new(),
            categories: 2,
            target_values: Vec::new(),
            features: 1000,
            lambda: 1e-4,
            rate: 1e-3,
            passes: 2,
            use_bias: true,
            probes: DEFAULT_PROBES,
        }
    }
}

impl TrainConfig {
    /// Binary classifier for `target` over numeric `predictors`.
    pub fn new<S: AsRef<str>>(target: impl Into<String>, predictors: &[S]) -> Self {
        Self {
            target: target.into(),
            predictors: predictors.iter().map(|p| p.as_ref().to_owned()).collect(),
            ..Self::default()
        }
    }

    /// Set predictor kinds.
    pub fn with_kinds<S: AsRef<str>>(mut self, kinds: &[S]) -> Self {
        self.kinds = kinds.iter().map(|k| k.as_ref().to_owned()).collect();
        self
    }

    /// Set the number of target categories.
    pub fn with_categories(mut self, categories: usize) -> Self {
        self.categories = categories;
        self
    }

    /// Pre-declare target values.
    pub fn with_target_values<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.target_values = values.iter().map(|v| v.as_ref().to_owned()).collect();
        self
    }

    /// Set the hashed feature space width.
    pub fn with_features(mut self, features: usize) -> Self {
        self.features = features;
        self
    }

    /// Set L2 decay.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set learning rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the number of passes.
    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    /// Include or drop the bias term.
    pub fn with_bias(mut self, use_bias: bool) -> Self {
        self.use_bias = use_bias;
        self
    }

    /// Set hash probes per value.
    pub fn with_probes(mut self, probes: usize) -> Self {
        self.probes = probes;
        self
    }

    /// Check every option without building anything.
    pub fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            return Err(Error::invalid("passes", "must be > 0"));
        }
        if self.probes == 0 {
            return Err(Error::invalid("probes", "must be > 0"));
        }
        self.encoder()?;
        OnlineLogisticModel::new(self.logistic())?;
        Ok(())
    }

    fn encoder(&self) -> Result<FeatureEncoder> {
        let fields = FieldSpec::zip(&self.predictors, &self.kinds)?;
        let target =
            TargetSpec::new(self.target.as_str(), self.categories).with_categories(&self.target_values);
        Ok(FeatureEncoder::new(fields, target, self.features)?.with_probes(self.probes))
    }

    fn logistic(&self) -> LogisticConfig {
        LogisticConfig::new(self.features, self.categories)
            .with_learning_rate(self.rate)
            .with_lambda(self.lambda)
            .with_bias(self.use_bias)
    }
}

/// A trained classifier and the encoder (with its frozen target dictionary)
/// needed to score new rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTrainedModel"))]
pub struct TrainedModel {
    encoder: FeatureEncoder,
    model: OnlineLogisticModel,
}

impl TrainedModel {
    /// Pair an encoder with a classifier over the same feature width and
    /// category count.
    pub fn from_parts(encoder: FeatureEncoder, model: OnlineLogisticModel) -> Result<Self> {
        if encoder.num_features() != model.config().num_features {
            return Err(Error::DimensionMismatch {
                expected: model.config().num_features,
                found: encoder.num_features(),
            });
        }
        if encoder.target().max_categories() != model.num_categories() {
            return Err(Error::invalid(
                "categories",
                format!(
                    "encoder admits {} categories, model has {}",
                    encoder.target().max_categories(),
                    model.num_categories()
                ),
            ));
        }
        Ok(Self { encoder, model })
    }

    /// Row encoder.
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Fitted classifier.
    pub fn model(&self) -> &OnlineLogisticModel {
        &self.model
    }

    /// Target values, indexed by category id.
    pub fn categories(&self) -> &[String] {
        self.encoder.target().categories()
    }

    /// Category probabilities for a row laid out like the training header.
    pub fn classify_row<S: AsRef<str>>(&self, row: &[S]) -> Result<Vec<f64>> {
        let v = self.encoder.encode_features(row)?;
        self.model.classify(&v)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTrainedModel {
    encoder: FeatureEncoder,
    model: OnlineLogisticModel,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTrainedModel> for TrainedModel {
    type Error = Error;

    fn try_from(raw: RawTrainedModel) -> Result<Self> {
        Self::from_parts(raw.encoder, raw.model)
    }
}

/// Train a classifier over `rows`.
///
/// The first pass consumes `rows` once, interning target values in first-seen
/// order; the dictionary is frozen afterwards and the encoded rows are reused
/// for the remaining passes. The first bad row aborts training with
/// [`Error::Row`].
pub fn train<H, I, R, S>(config: &TrainConfig, header: &[H], rows: I) -> Result<TrainedModel>
where
    H: AsRef<str>,
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    config.validate()?;
    let mut encoder = config.encoder()?;
    encoder.bind_header(header)?;
    let mut model = OnlineLogisticModel::new(config.logistic())?;

    let mut examples: Vec<(usize, SparseVector)> = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
        let (target, v) = encoder.encode(row.as_ref()).map_err(|e| e.at_row(i))?;
        model.train(target, &v).map_err(|e| e.at_row(i))?;
        examples.push((target, v));
    }
    if examples.is_empty() {
        return Err(Error::EmptyInput);
    }
    encoder.freeze_target();
    info!(
        pass = 1,
        passes = config.passes,
        rows = examples.len(),
        categories = encoder.target().categories().len(),
        "training pass complete"
    );

    for pass in 2..=config.passes {
        for (i, (target, v)) in examples.iter().enumerate() {
            model.train(*target, v).map_err(|e| e.at_row(i))?;
        }
        debug!(pass, passes = config.passes, "training pass complete");
    }
    info!(steps = model.steps(), "training finished");

    TrainedModel::from_parts(encoder, model)
}

/// Score of one evaluated row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowScore {
    /// Row index in the input.
    pub index: usize,
    /// True category id.
    pub label: usize,
    /// `P(category 1 | row)`.
    pub score: f64,
    /// `ln P(label | row)`.
    pub log_likelihood: f64,
}

/// Output of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Area under the ROC curve; an error when one class is missing.
    pub auc: Result<f64>,
    /// Counts indexed `[predicted][actual]`.
    pub confusion: [[u64; 2]; 2],
    /// Mean negative log-likelihood indexed `[predicted][actual]`.
    pub entropy: [[f64; 2]; 2],
    /// Scored rows, in input order.
    pub rows: Vec<RowScore>,
    /// Rows that could not be scored, with their index.
    pub row_errors: Vec<(usize, Error)>,
}

impl Evaluation {
    /// Mean log-likelihood over scored rows.
    pub fn mean_log_likelihood(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.rows.iter().map(|r| r.log_likelihood).sum::<f64>() / self.rows.len() as f64)
    }
}

/// Score `rows` with a binary model.
///
/// `header` may order columns differently from the training header. Rows that
/// fail to encode (bad cells, wrong width, unseen target values) are listed in
/// [`Evaluation::row_errors`] and left out of the metrics.
pub fn evaluate<H, I, R, S>(model: &TrainedModel, header: &[H], rows: I) -> Result<Evaluation>
where
    H: AsRef<str>,
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    if model.model.num_categories() != 2 {
        return Err(Error::invalid(
            "categories",
            "evaluation supports binary models only",
        ));
    }
    let mut encoder = model.encoder.clone();
    encoder.freeze_target();
    encoder.bind_header(header)?;

    let mut evaluator = Evaluator::new();
    let mut scored = Vec::new();
    let mut row_errors = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        let outcome = encoder.encode(row.as_ref()).and_then(|(label, v)| {
            let score = model.model.classify_scalar(&v)?;
            let log_likelihood = model.model.log_likelihood(label, &v)?;
            Ok(RowScore {
                index,
                label,
                score,
                log_likelihood,
            })
        });
        match outcome {
            Ok(r) => {
                evaluator.add(r.label, r.score)?;
                scored.push(r);
            }
            Err(e) => {
                debug!(index, error = %e, "row skipped");
                row_errors.push((index, e));
            }
        }
    }

    info!(
        rows = scored.len(),
        errors = row_errors.len(),
        "evaluation complete"
    );
    Ok(Evaluation {
        auc: evaluator.auc(),
        confusion: evaluator.confusion(),
        entropy: evaluator.entropy(),
        rows: scored,
        row_errors,
    })
}

/// Which centroid clusterer [`cluster`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Algorithm {
    /// Hard assignment.
    #[default]
    KMeans,
    /// Soft assignment with fuzziness `m`.
    FuzzyKMeans,
}

/// Options for [`cluster`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClusterConfig {
    /// Clusterer.
    pub algorithm: Algorithm,
    /// Distance measure name, resolved with [`measure_from_name`].
    pub measure: String,
    /// Number of clusters (ignored by canopy and explicit-center seeding).
    pub k: usize,
    /// Fuzziness `m` for Fuzzy K-means.
    pub fuzziness: f64,
    /// Largest center movement still counted as converged.
    pub convergence_delta: f64,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Starting centers.
    pub seeding: Seeding,
    /// Random seed.
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::KMeans,
            measure: "squared_euclidean".to_owned(),
            k: 2,
            fuzziness: 2.0,
            convergence_delta: 1e-4,
            max_iterations: 100,
            seeding: Seeding::Random,
            seed: None,
        }
    }
}

impl ClusterConfig {
    /// K-means with `k` clusters.
    pub fn kmeans(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Fuzzy K-means with `k` clusters and fuzziness `m`.
    pub fn fuzzy(k: usize, m: f64) -> Self {
        Self {
            algorithm: Algorithm::FuzzyKMeans,
            k,
            fuzziness: m,
            ..Self::default()
        }
    }

    /// Set the distance measure by name.
    pub fn with_measure(mut self, name: impl Into<String>) -> Self {
        self.measure = name.into();
        self
    }

    /// Seed with canopies using thresholds `t1 >= t2`.
    pub fn with_canopy(mut self, t1: f64, t2: f64) -> Self {
        self.seeding = Seeding::Canopy { t1, t2 };
        self
    }

    /// Set the seeding strategy.
    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    /// Set the convergence delta.
    pub fn with_convergence_delta(mut self, delta: f64) -> Self {
        self.convergence_delta = delta;
        self
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Cluster dense points as configured.
pub fn cluster(points: &[Vec<f64>], config: &ClusterConfig) -> Result<ClusterFit> {
    let measure = measure_from_name(&config.measure)?;
    debug!(
        algorithm = ?config.algorithm,
        measure = measure.name(),
        points = points.len(),
        "clustering"
    );
    match config.algorithm {
        Algorithm::KMeans => {
            let mut kmeans = KMeans::new(config.k)
                .with_measure(measure)
                .with_seeding(config.seeding.clone())
                .with_convergence_delta(config.convergence_delta)
                .with_max_iter(config.max_iterations);
            if let Some(seed) = config.seed {
                kmeans = kmeans.with_seed(seed);
            }
            kmeans.fit(points)
        }
        Algorithm::FuzzyKMeans => {
            let mut fuzzy = FuzzyKMeans::new(config.k)
                .with_fuzziness(config.fuzziness)
                .with_measure(measure)
                .with_seeding(config.seeding.clone())
                .with_convergence_delta(config.convergence_delta)
                .with_max_iter(config.max_iterations);
            if let Some(seed) = config.seed {
                fuzzy = fuzzy.with_seed(seed);
            }
            fuzzy.fit(points)
        }
    }
}

/// Parse the named numeric `columns` of each row into a dense point.
///
/// An empty `columns` list selects every header column. Header names and
/// cells are cleaned of whitespace and double quotes, as in
/// [`FeatureEncoder::bind_header`].
pub fn rows_to_points<H, C, I, R, S>(
    header: &[H],
    rows: I,
    columns: &[C],
) -> Result<Vec<Vec<f64>>>
where
    H: AsRef<str>,
    C: AsRef<str>,
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let names: Vec<&str> = header.iter().map(|h| clean(h.as_ref())).collect();
    let positions: Vec<usize> = if columns.is_empty() {
        (0..names.len()).collect()
    } else {
        columns
            .iter()
            .map(|c| {
                let c = clean(c.as_ref());
                names
                    .iter()
                    .position(|&n| n == c)
                    .ok_or_else(|| Error::MissingField { field: c.to_owned() })
            })
            .collect::<Result<_>>()?
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| -> Result<Vec<f64>> {
            let row = row.as_ref();
            if row.len() != names.len() {
                return Err(Error::ColumnCount {
                    expected: names.len(),
                    found: row.len(),
                }
                .at_row(i));
            }
            positions
                .iter()
                .map(|&p| {
                    let cell = clean(row[p].as_ref());
                    cell.parse::<f64>().map_err(|_| {
                        Error::Unparsable {
                            field: names[p].to_owned(),
                            value: cell.to_owned(),
                        }
                        .at_row(i)
                    })
                })
                .collect()
        })
        .collect()
}
