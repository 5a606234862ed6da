//! Pluggable distance measures and a by-name registry.
//!
//! Every clusterer takes an `Arc<dyn DistanceMeasure>`; callers that only have
//! a configured string use [`measure_from_name`].
//!
//! | Name | Distance |
//! |------|----------|
//! | `squared_euclidean` (default) | Σ(aᵢ - bᵢ)² |
//! | `euclidean` | √Σ(aᵢ - bᵢ)² |
//! | `manhattan` | Σ\|aᵢ - bᵢ\| |
//! | `chebyshev` | max \|aᵢ - bᵢ\| |
//! | `cosine` | 1 - a·b / (\|a\| \|b\|) |
//! | `tanimoto` | 1 - a·b / (\|a\|² + \|b\|² - a·b) |
//!
//! Names are matched case-insensitively, ignoring `_`/`-`, a package prefix,
//! and a `DistanceMeasure` suffix, so `"SquaredEuclideanDistanceMeasure"` and
//! `"squared-euclidean"` resolve to the same measure.
//!
//! Cosine and Tanimoto are angular: they are zero for parallel vectors, not
//! only for equal ones.

use crate::error::{Error, Result};
use ndarray::ArrayView1;
use std::fmt;
use std::sync::Arc;

/// A non-negative, symmetric distance between two equally sized points.
pub trait DistanceMeasure: fmt::Debug + Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Distance between `a` and `b`.
    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64;

    /// Distance between two slices.
    fn distance_slices(&self, a: &[f64], b: &[f64]) -> f64 {
        self.distance(ArrayView1::from(a), ArrayView1::from(b))
    }
}

/// Σ(aᵢ - bᵢ)².
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl DistanceMeasure for SquaredEuclidean {
    fn name(&self) -> &'static str {
        "squared_euclidean"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}

/// √Σ(aᵢ - bᵢ)².
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl DistanceMeasure for Euclidean {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        SquaredEuclidean.distance(a, b).sqrt()
    }
}

/// Σ|aᵢ - bᵢ|.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl DistanceMeasure for Manhattan {
    fn name(&self) -> &'static str {
        "manhattan"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }
}

/// max |aᵢ - bᵢ|.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chebyshev;

impl DistanceMeasure for Chebyshev {
    fn name(&self) -> &'static str {
        "chebyshev"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }
}

/// 1 - cos θ. Two zero vectors are at distance 0; a zero vector is at
/// distance 1 from anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl DistanceMeasure for Cosine {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let norms = a.dot(&a).sqrt() * b.dot(&b).sqrt();
        if norms == 0.0 {
            return if a.iter().chain(b.iter()).all(|&x| x == 0.0) {
                0.0
            } else {
                1.0
            };
        }
        (1.0 - a.dot(&b) / norms).max(0.0)
    }
}

/// 1 - a·b / (|a|² + |b|² - a·b).
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanimoto;

impl DistanceMeasure for Tanimoto {
    fn name(&self) -> &'static str {
        "tanimoto"
    }

    fn distance(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        let ab = a.dot(&b);
        let denom = a.dot(&a) + b.dot(&b) - ab;
        if denom == 0.0 {
            return 0.0;
        }
        (1.0 - ab / denom).max(0.0)
    }
}

type Constructor = fn() -> Arc<dyn DistanceMeasure>;

fn make<M: DistanceMeasure + Default + 'static>() -> Arc<dyn DistanceMeasure> {
    Arc::new(M::default())
}

/// Normalized key -> constructor.
const REGISTRY: &[(&str, Constructor)] = &[
    ("squaredeuclidean", make::<SquaredEuclidean>),
    ("euclidean", make::<Euclidean>),
    ("manhattan", make::<Manhattan>),
    ("chebyshev", make::<Chebyshev>),
    ("cosine", make::<Cosine>),
    ("tanimoto", make::<Tanimoto>),
];

/// The default measure, squared Euclidean.
pub fn default_measure() -> Arc<dyn DistanceMeasure> {
    Arc::new(SquaredEuclidean)
}

/// Look up a measure by name.
pub fn measure_from_name(name: &str) -> Result<Arc<dyn DistanceMeasure>> {
    let key = normalize(name);
    REGISTRY
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, make)| make())
        .ok_or_else(|| Error::UnknownMeasure(name.to_owned()))
}

/// Registered measure names.
pub fn measure_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(_, make)| make().name())
}

fn normalize(name: &str) -> String {
    let base = name.rsplit('.').next().unwrap_or(name);
    let key: String = base
        .chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    match key.strip_suffix("distancemeasure") {
        Some(stripped) => stripped.to_owned(),
        None => key,
    }
}
