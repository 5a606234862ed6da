//! Agreement between a cluster assignment and known class labels.
//!
//! Clustering is unsupervised, but when a labeled dataset is clustered it is
//! common to ask how well the partition recovers the classes.
//!
//! | Metric | Range | Label ids must match? |
//! |--------|-------|-----------------------|
//! | [`direct_accuracy`] | [0, 1] | yes |
//! | [`purity`] | [0, 1] | no |
//! | [`nmi`] | [0, 1] | no |
//!
//! `direct_accuracy` only makes sense when cluster ids were seeded so that
//! they line up with class ids; `purity` and `nmi` are invariant to relabeling.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Correctly and incorrectly clustered counts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusteringAccuracy {
    /// Points whose cluster id equals their label.
    pub correct: usize,
    /// Remaining points.
    pub incorrect: usize,
}

impl ClusteringAccuracy {
    /// Fraction of correct points.
    pub fn correct_ratio(&self) -> f64 {
        let n = self.correct + self.incorrect;
        if n == 0 {
            0.0
        } else {
            self.correct as f64 / n as f64
        }
    }

    /// Fraction of incorrect points.
    pub fn incorrect_ratio(&self) -> f64 {
        let n = self.correct + self.incorrect;
        if n == 0 {
            0.0
        } else {
            self.incorrect as f64 / n as f64
        }
    }
}

/// Count points whose cluster id equals their class label.
pub fn direct_accuracy(pred: &[usize], truth: &[usize]) -> Result<ClusteringAccuracy> {
    check_lengths(pred, truth)?;
    let correct = pred.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(ClusteringAccuracy {
        correct,
        incorrect: pred.len() - correct,
    })
}

/// Fraction of points belonging to the majority class of their cluster.
///
/// ```rust
/// use furrow::metrics::purity;
///
/// let pred = [1, 1, 0, 0];
/// let truth = [0, 0, 1, 1];
/// assert_eq!(purity(&pred, &truth).unwrap(), 1.0);
/// ```
pub fn purity(pred: &[usize], truth: &[usize]) -> Result<f64> {
    check_lengths(pred, truth)?;
    let joint = contingency(pred, truth);

    let mut cluster_max: HashMap<usize, usize> = HashMap::new();
    for (&(p, _), &count) in &joint {
        let best = cluster_max.entry(p).or_insert(0);
        *best = (*best).max(count);
    }
    let correct: usize = cluster_max.values().sum();
    Ok(correct as f64 / pred.len() as f64)
}

/// Normalized mutual information, `2 I(U; V) / (H(U) + H(V))`.
///
/// Two constant labelings agree perfectly and score 1.
pub fn nmi(pred: &[usize], truth: &[usize]) -> Result<f64> {
    check_lengths(pred, truth)?;
    let n = pred.len() as f64;
    let joint = contingency(pred, truth);
    let p_pred = marginal(pred);
    let p_truth = marginal(truth);

    let mi: f64 = joint
        .iter()
        .map(|(&(p, t), &count)| {
            let p_joint = count as f64 / n;
            let p_p = p_pred[&p] as f64 / n;
            let p_t = p_truth[&t] as f64 / n;
            p_joint * (p_joint / (p_p * p_t)).ln()
        })
        .sum();

    let denom = entropy(&p_pred, n) + entropy(&p_truth, n);
    Ok(if denom > 0.0 { 2.0 * mi / denom } else { 1.0 })
}

fn check_lengths(pred: &[usize], truth: &[usize]) -> Result<()> {
    if pred.is_empty() {
        return Err(Error::EmptyInput);
    }
    if pred.len() != truth.len() {
        return Err(Error::DimensionMismatch {
            expected: pred.len(),
            found: truth.len(),
        });
    }
    Ok(())
}

fn contingency(pred: &[usize], truth: &[usize]) -> HashMap<(usize, usize), usize> {
    let mut table = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth) {
        *table.entry((p, t)).or_insert(0) += 1;
    }
    table
}

fn marginal(labels: &[usize]) -> HashMap<usize, usize> {
    let mut counts = HashMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    counts
}

fn entropy(counts: &HashMap<usize, usize>, n: f64) -> f64 {
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_accuracy_counts() {
        let acc = direct_accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap();
        assert_eq!(acc.correct, 3);
        assert_eq!(acc.incorrect, 1);
        assert_eq!(acc.correct_ratio(), 0.75);
        assert_eq!(acc.incorrect_ratio(), 0.25);
    }

    #[test]
    fn test_relabeling_invariance() {
        let pred = [2, 2, 5, 5, 5];
        let truth = [0, 0, 1, 1, 1];
        assert_eq!(purity(&pred, &truth).unwrap(), 1.0);
        assert!((nmi(&pred, &truth).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(direct_accuracy(&pred, &truth).unwrap().correct, 0);
    }

    #[test]
    fn test_independent_labelings_have_low_nmi() {
        let pred = [0, 1, 0, 1];
        let truth = [0, 0, 1, 1];
        assert!(nmi(&pred, &truth).unwrap().abs() < 1e-12);
        assert_eq!(purity(&pred, &truth).unwrap(), 0.5);
    }

    #[test]
    fn test_length_checks() {
        assert!(purity(&[], &[]).is_err());
        assert!(nmi(&[0, 1], &[0]).is_err());
        assert!(direct_accuracy(&[0], &[0, 1]).is_err());
    }
}
