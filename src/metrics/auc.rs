//! Binary classifier evaluation from `(label, score)` pairs.
//!
//! # AUC
//!
//! The area under the ROC curve equals the probability that a random positive
//! outscores a random negative. It is computed with the Mann-Whitney rank sum:
//!
//! ```text
//! AUC = (R₊ - n₊(n₊ + 1)/2) / (n₊ n₋)
//! ```
//!
//! where `R₊` is the sum of the (1-based) ranks of positive scores in the
//! pooled ascending order. Tied scores share the average of their ranks, so a
//! constant scorer gets exactly 0.5.
//!
//! # Confusion and Entropy
//!
//! Both are 2×2 and indexed `[predicted][actual]`. The confusion matrix counts
//! hard decisions at the threshold. The entropy matrix is the soft analogue:
//! entry `[j][i]` is the mean of `-ln P(j)` over points whose actual label is
//! `i`, with `P(1) = score` and `P(0) = 1 - score`. A sharp, correct scorer has
//! a small diagonal and a large off-diagonal.

use crate::error::{Error, Result};

/// One recorded `(label, score)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScorePoint {
    /// Actual label, 0 or 1.
    pub label: usize,
    /// Model score for label 1.
    pub score: f64,
}

/// Accumulates scores and computes AUC, confusion, and entropy.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    points: Vec<ScorePoint>,
    threshold: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Empty evaluator with decision threshold 0.5.
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            threshold: 0.5,
        }
    }

    /// Use a different decision threshold for [`Evaluator::confusion`].
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Record one scored example.
    pub fn add(&mut self, label: usize, score: f64) -> Result<()> {
        if label > 1 {
            return Err(Error::LabelOutOfRange {
                label,
                n_categories: 2,
            });
        }
        self.points.push(ScorePoint { label, score });
        Ok(())
    }

    /// Recorded points in insertion order.
    pub fn points(&self) -> &[ScorePoint] {
        &self.points
    }

    /// Number of recorded points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Area under the ROC curve.
    ///
    /// Returns [`Error::UndefinedMetric`] unless both classes are present.
    pub fn auc(&self) -> Result<f64> {
        let n_pos = self.points.iter().filter(|p| p.label == 1).count();
        let n_neg = self.points.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Err(Error::UndefinedMetric {
                metric: "auc",
                reason: "needs at least one positive and one negative example",
            });
        }

        let mut sorted: Vec<&ScorePoint> = self.points.iter().collect();
        sorted.sort_by(|a, b| a.score.total_cmp(&b.score));

        let mut rank_sum_pos = 0.0;
        let mut start = 0;
        while start < sorted.len() {
            let mut end = start + 1;
            while end < sorted.len() && sorted[end].score == sorted[start].score {
                end += 1;
            }
            // Ranks start..end (0-based) share the mean 1-based rank.
            let avg_rank = (start + 1 + end) as f64 / 2.0;
            let positives = sorted[start..end].iter().filter(|p| p.label == 1).count();
            rank_sum_pos += avg_rank * positives as f64;
            start = end;
        }

        let n_pos = n_pos as f64;
        let n_neg = n_neg as f64;
        Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
    }

    /// Hard-decision counts, `[predicted][actual]`.
    pub fn confusion(&self) -> [[u64; 2]; 2] {
        let mut m = [[0u64; 2]; 2];
        for p in &self.points {
            let predicted = usize::from(p.score > self.threshold);
            m[predicted][p.label] += 1;
        }
        m
    }

    /// Mean negative log-likelihood, `[predicted][actual]`. Empty classes give 0.
    pub fn entropy(&self) -> [[f64; 2]; 2] {
        let mut sums = [[0.0f64; 2]; 2];
        let mut counts = [0usize; 2];
        for p in &self.points {
            counts[p.label] += 1;
            sums[0][p.label] -= (-p.score).ln_1p();
            sums[1][p.label] -= p.score.ln();
        }
        for row in sums.iter_mut() {
            for (actual, cell) in row.iter_mut().enumerate() {
                if counts[actual] > 0 {
                    *cell /= counts[actual] as f64;
                }
            }
        }
        sums
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn evaluator(points: &[(usize, f64)]) -> Evaluator {
        let mut e = Evaluator::new();
        for &(label, score) in points {
            e.add(label, score).unwrap();
        }
        e
    }

    #[test]
    fn test_auc_perfect_ranking() {
        let e = evaluator(&[(0, 0.1), (0, 0.3), (1, 0.35), (1, 0.9)]);
        assert_eq!(e.auc().unwrap(), 1.0);
    }

    #[test]
    fn test_auc_inverted_ranking() {
        let e = evaluator(&[(1, 0.1), (1, 0.3), (0, 0.35), (0, 0.9)]);
        assert_eq!(e.auc().unwrap(), 0.0);
    }

    #[test]
    fn test_auc_indistinguishable_scores() {
        let e = evaluator(&[(0, 0.4), (1, 0.4), (0, 0.4), (1, 0.4), (1, 0.4)]);
        assert_eq!(e.auc().unwrap(), 0.5);

        // Identical score distributions across classes.
        let e = evaluator(&[(0, 0.2), (1, 0.2), (0, 0.8), (1, 0.8)]);
        assert_eq!(e.auc().unwrap(), 0.5);
    }

    #[test]
    fn test_auc_partial() {
        // Pairs (pos, neg): (0.8,0.1) win, (0.8,0.9) lose, (0.4,0.1) win, (0.4,0.9) lose.
        let e = evaluator(&[(0, 0.1), (1, 0.4), (1, 0.8), (0, 0.9)]);
        assert!((e.auc().unwrap() - 0.5).abs() < 1e-12);
        let e = evaluator(&[(0, 0.1), (1, 0.4), (1, 0.95), (0, 0.9)]);
        assert!((e.auc().unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_is_undefined() {
        let e = evaluator(&[(1, 0.2), (1, 0.7)]);
        assert_eq!(e.auc().unwrap_err().kind(), ErrorKind::UndefinedMetric);
        assert!(Evaluator::new().auc().is_err());
    }

    #[test]
    fn test_confusion_indexing() {
        let e = evaluator(&[(0, 0.1), (0, 0.7), (1, 0.9), (1, 0.2), (1, 0.6)]);
        let m = e.confusion();
        assert_eq!(m[0][0], 1); // true negative
        assert_eq!(m[1][0], 1); // false positive
        assert_eq!(m[1][1], 2); // true positive
        assert_eq!(m[0][1], 1); // false negative
        // Exactly at the threshold counts as negative.
        assert_eq!(evaluator(&[(1, 0.5)]).confusion()[0][1], 1);
    }

    #[test]
    fn test_custom_threshold_moves_decisions() {
        let points = [(0, 0.3), (0, 0.6), (1, 0.7), (1, 0.9)];
        assert_eq!(evaluator(&points).confusion(), [[1, 0], [1, 2]]);

        let mut e = Evaluator::new().with_threshold(0.7);
        for &(label, score) in &points {
            e.add(label, score).unwrap();
        }
        // 0.7 itself is not above the threshold.
        assert_eq!(e.confusion(), [[2, 1], [0, 1]]);
        assert_eq!(e.auc().unwrap(), 1.0);
    }

    #[test]
    fn test_entropy_matrix() {
        let e = evaluator(&[(0, 0.25), (1, 0.5)]);
        let m = e.entropy();
        assert!((m[0][0] - -(0.75f64.ln())).abs() < 1e-12);
        assert!((m[1][0] - -(0.25f64.ln())).abs() < 1e-12);
        assert!((m[0][1] - -(0.5f64.ln())).abs() < 1e-12);
        assert!((m[1][1] - -(0.5f64.ln())).abs() < 1e-12);
        assert_eq!(evaluator(&[(1, 0.5)]).entropy()[0][0], 0.0);
    }

    #[test]
    fn test_rejects_non_binary_label() {
        let mut e = Evaluator::new();
        assert_eq!(e.add(2, 0.5).unwrap_err().kind(), ErrorKind::Data);
        assert!(e.is_empty());
    }

    proptest! {
        #[test]
        fn prop_auc_is_a_probability_and_flips(
            points in prop::collection::vec((0usize..2, 0.0f64..1.0), 2..60),
        ) {
            let e = evaluator(&points);
            if let Ok(auc) = e.auc() {
                prop_assert!((0.0..=1.0).contains(&auc));
                let flipped: Vec<_> = points.iter().map(|&(l, s)| (1 - l, s)).collect();
                let other = evaluator(&flipped).auc().unwrap();
                prop_assert!((auc + other - 1.0).abs() < 1e-9);
            }
        }
    }
}
