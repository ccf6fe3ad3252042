//! Binary classification metrics

use crate::error::{CollisionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 2x2 confusion matrix, fatal = positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t > 0.5, p > 0.5) {
                (true, true) => cm.true_positive += 1,
                (false, true) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (true, false) => cm.false_negative += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// Rows are actual class, columns predicted class, non-fatal first
    pub fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }
}

/// Precision, recall, F1 and support for one class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }

    /// `(non_fatal, fatal)` metrics from a confusion matrix
    pub fn per_class(cm: &ConfusionMatrix) -> (Self, Self) {
        (
            Self::from_counts(cm.true_negative, cm.false_negative, cm.false_positive),
            Self::from_counts(cm.true_positive, cm.false_positive, cm.false_negative),
        )
    }

    pub fn macro_average(a: &Self, b: &Self) -> Self {
        Self {
            precision: (a.precision + b.precision) / 2.0,
            recall: (a.recall + b.recall) / 2.0,
            f1: (a.f1 + b.f1) / 2.0,
            support: a.support + b.support,
        }
    }

    pub fn weighted_average(a: &Self, b: &Self) -> Self {
        let total = (a.support + b.support) as f64;
        if total == 0.0 {
            return Self::default();
        }
        let (wa, wb) = (a.support as f64 / total, b.support as f64 / total);
        Self {
            precision: wa * a.precision + wb * b.precision,
            recall: wa * a.recall + wb * b.recall,
            f1: wa * a.f1 + wb * b.f1,
            support: a.support + b.support,
        }
    }
}

/// Area under the ROC curve via the rank statistic; tied scores share their average rank.
/// `None` when only one class is present.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<Option<f64>> {
    check_lengths(y_true, scores)?;
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group covers start+1..=end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if y_true[idx] > 0.5 {
                rank_sum_pos += avg_rank;
            }
        }
        start = end;
    }

    let n_pos_f = n_pos as f64;
    let u = rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok(Some(u / (n_pos_f * n_neg as f64)))
}

/// Average precision, `sum_n (R_n - R_{n-1}) P_n` over descending score thresholds.
/// `None` when there are no positives.
pub fn average_precision(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<Option<f64>> {
    check_lengths(y_true, scores)?;
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if n_pos == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut start = 0;

    while start < order.len() {
        let mut end = start;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            if y_true[order[end]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            end += 1;
        }
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
        start = end;
    }

    Ok(Some(ap))
}

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(CollisionError::Shape {
            expected: format!("{} values", a.len()),
            actual: format!("{} values", b.len()),
        });
    }
    Ok(())
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
