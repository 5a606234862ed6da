//! Sparse and dense vector arithmetic.
//!
//! Hashed feature vectors are mostly zero: a row with ten predictors touches
//! at most `10 * probes` of the (typically 1000+) hashed slots. [`SparseVector`]
//! stores only the non-zero entries in index order, so iterating active
//! coordinates during an SGD step is proportional to the row, not the width.
//!
//! Dense operands are `ndarray` views, the same row type the model and the
//! clustering code keep their coefficients and points in.

use crate::error::{Error, Result};
use ndarray::{ArrayView1, ArrayViewMut1};
use std::collections::BTreeMap;

/// Fixed-width sparse vector of `f64` weights.
///
/// Invariant: every stored index is `< dim`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSparseVector"))]
pub struct SparseVector {
    dim: usize,
    entries: BTreeMap<usize, f64>,
}

impl SparseVector {
    /// Empty vector of width `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: BTreeMap::new(),
        }
    }

    /// Build from `(index, weight)` pairs; repeated indices accumulate.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let mut v = Self::new(dim);
        for (i, w) in pairs {
            v.add(i, w)?;
        }
        Ok(v)
    }

    /// Dense input, keeping non-zero entries.
    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            dim: values.len(),
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, w)| **w != 0.0)
                .map(|(i, &w)| (i, w))
                .collect(),
        }
    }

    /// Width of the index domain.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Weight at `index` (zero when absent or out of range).
    pub fn get(&self, index: usize) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Add `weight` at `index`.
    pub fn add(&mut self, index: usize, weight: f64) -> Result<()> {
        if index >= self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: index + 1,
            });
        }
        *self.entries.entry(index).or_insert(0.0) += weight;
        Ok(())
    }

    /// Stored `(index, weight)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&i, &w)| (i, w))
    }

    /// Entries with a non-zero weight. These are the coordinates an SGD step touches.
    pub fn active(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.iter().filter(|&(_, w)| w != 0.0)
    }

    /// Dot product against a dense vector at least as wide. Extra trailing
    /// entries (a bias slot, say) are ignored.
    pub fn dot_dense(&self, dense: ArrayView1<'_, f64>) -> Result<f64> {
        if dense.len() < self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: dense.len(),
            });
        }
        Ok(self.iter().map(|(i, w)| w * dense[i]).sum())
    }

    /// Sparse-sparse dot product.
    pub fn dot(&self, other: &SparseVector) -> Result<f64> {
        if self.dim != other.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        let (small, large) = if self.nnz() <= other.nnz() {
            (self, other)
        } else {
            (other, self)
        };
        Ok(small.iter().map(|(i, w)| w * large.get(i)).sum())
    }

    /// `dense += alpha * self`.
    pub fn scaled_add_to(&self, alpha: f64, mut dense: ArrayViewMut1<'_, f64>) -> Result<()> {
        if dense.len() < self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: dense.len(),
            });
        }
        for (i, w) in self.iter() {
            dense[i] += alpha * w;
        }
        Ok(())
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSparseVector {
    dim: usize,
    entries: BTreeMap<usize, f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSparseVector> for SparseVector {
    type Error = Error;

    fn try_from(raw: RawSparseVector) -> Result<Self> {
        Self::from_pairs(raw.dim, raw.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sparse_rejects_out_of_range_index() {
        let mut v = SparseVector::new(4);
        assert!(v.add(3, 1.0).is_ok());
        assert!(matches!(
            v.add(4, 1.0),
            Err(Error::DimensionMismatch { expected: 4, .. })
        ));
    }

    #[test]
    fn test_sparse_accumulates_collisions() {
        let v = SparseVector::from_pairs(8, [(2, 1.0), (5, 2.0), (2, 0.5)]).unwrap();
        assert_eq!(v.nnz(), 2);
        assert_eq!(v.get(2), 1.5);
        assert_eq!(v.get(7), 0.0);
    }

    #[test]
    fn test_dot_products_agree() {
        let a = SparseVector::from_dense(&[1.0, 0.0, 3.0, 0.0]);
        let b = SparseVector::from_dense(&[2.0, 5.0, -1.0, 0.0]);
        let dense_b = array![2.0, 5.0, -1.0, 0.0];
        assert_eq!(a.dot(&b).unwrap(), -1.0);
        assert_eq!(a.dot_dense(dense_b.view()).unwrap(), -1.0);
        assert!(a.dot(&SparseVector::new(3)).is_err());
    }

    #[test]
    fn test_dot_dense_ignores_trailing_slot() {
        let a = SparseVector::from_dense(&[1.0, 2.0]);
        let row = array![3.0, 4.0, 100.0];
        assert_eq!(a.dot_dense(row.view()).unwrap(), 11.0);
        assert!(a.dot_dense(array![1.0].view()).is_err());
    }

    #[test]
    fn test_scaled_add() {
        let a = SparseVector::from_dense(&[1.0, 0.0, 2.0]);
        let mut y = array![1.0, 1.0, 1.0];
        a.scaled_add_to(-2.0, y.view_mut()).unwrap();
        assert_eq!(y, array![-1.0, 1.0, -3.0]);
    }

    #[test]
    fn test_norm() {
        assert_eq!(SparseVector::from_dense(&[3.0, 0.0, 4.0]).norm(), 5.0);
        assert_eq!(SparseVector::new(5).norm(), 0.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_checks_indices() {
        let ok: SparseVector = serde_json::from_str(r#"{"dim":4,"entries":{"3":1.5}}"#).unwrap();
        assert_eq!(ok.get(3), 1.5);
        let bad = serde_json::from_str::<SparseVector>(r#"{"dim":2,"entries":{"5":1.0}}"#);
        assert!(bad.is_err());
    }
}
