//! Held-out evaluation of a fitted ensemble
//!
//! The evaluator only accepts `Evaluation`-role datasets, so resampled
//! training data can never be scored as if it were a test split.

mod metrics;

pub use metrics::{average_precision, roc_auc, ClassMetrics, ConfusionMatrix};

use crate::dataset::{Dataset, DatasetRole};
use crate::ensemble::VotingEnsemble;
use crate::error::{CollisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// Metrics of one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub n_samples: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub non_fatal: ClassMetrics,
    pub fatal: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// Present when every voter produces probabilities
    pub roc_auc: Option<f64>,
    pub average_precision: Option<f64>,
}

impl EvaluationReport {
    /// Build the report from labels, predictions and optional fatal probabilities
    pub fn compute(
        y_true: &ndarray::Array1<f64>,
        y_pred: &ndarray::Array1<f64>,
        proba: Option<&ndarray::Array1<f64>>,
    ) -> Result<Self> {
        let confusion = ConfusionMatrix::compute(y_true, y_pred)?;
        let (non_fatal, fatal) = ClassMetrics::per_class(&confusion);

        let (roc_auc, average_precision) = match proba {
            Some(p) => (roc_auc(y_true, p)?, average_precision(y_true, p)?),
            None => (None, None),
        };

        Ok(Self {
            n_samples: y_true.len(),
            accuracy: confusion.accuracy(),
            confusion,
            macro_avg: ClassMetrics::macro_average(&non_fatal, &fatal),
            weighted_avg: ClassMetrics::weighted_average(&non_fatal, &fatal),
            non_fatal,
            fatal,
            roc_auc,
            average_precision,
        })
    }

    /// Plain-text classification report
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Accuracy: {:.4}", self.accuracy);
        let _ = writeln!(out);
        let _ = writeln!(out, "Confusion matrix (rows = actual, columns = predicted):");
        let rows = self.confusion.as_rows();
        let _ = writeln!(out, "{:>20}{:>12}{:>12}", "", "Non-Fatal", "Fatal");
        let _ = writeln!(out, "{:>20}{:>12}{:>12}", "Non-Fatal", rows[0][0], rows[0][1]);
        let _ = writeln!(out, "{:>20}{:>12}{:>12}", "Fatal", rows[1][0], rows[1][1]);
        let _ = writeln!(out);
        let _ = writeln!(out, "Classification report:");
        let _ = writeln!(
            out,
            "{:>14}{:>11}{:>10}{:>10}{:>10}",
            "", "precision", "recall", "f1-score", "support"
        );
        let _ = writeln!(out);
        for (name, m) in [("Non-Fatal", &self.non_fatal), ("Fatal", &self.fatal)] {
            let _ = writeln!(out, "{}", metric_line(name, m));
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>14}{:>11}{:>10}{:>10.2}{:>10}",
            "accuracy", "", "", self.accuracy, self.n_samples
        );
        let _ = writeln!(out, "{}", metric_line("macro avg", &self.macro_avg));
        let _ = writeln!(out, "{}", metric_line("weighted avg", &self.weighted_avg));

        if self.roc_auc.is_some() || self.average_precision.is_some() {
            let _ = writeln!(out);
        }
        if let Some(auc) = self.roc_auc {
            let _ = writeln!(out, "ROC-AUC: {:.4}", auc);
        }
        if let Some(ap) = self.average_precision {
            let _ = writeln!(out, "Average precision: {:.4}", ap);
        }
        out
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_text())?;
        info!(path = %path.display(), "wrote classification report");
        Ok(())
    }
}

fn metric_line(name: &str, m: &ClassMetrics) -> String {
    format!(
        "{:>14}{:>11.2}{:>10.2}{:>10.2}{:>10}",
        name, m.precision, m.recall, m.f1, m.support
    )
}

/// Scores a fitted ensemble on a held-out dataset
#[derive(Debug, Clone, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, model: &VotingEnsemble, data: &Dataset) -> Result<EvaluationReport> {
        if data.role != DatasetRole::Evaluation {
            return Err(CollisionError::Validation(
                "evaluation requires a held-out dataset, got training data".to_string(),
            ));
        }

        let y_pred = model.predict(&data.x)?;
        let proba = if model.supports_proba() {
            Some(model.predict_proba(&data.x)?)
        } else {
            warn!("ensemble has no probability output, skipping ROC-AUC and average precision");
            None
        };

        let report = EvaluationReport::compute(&data.y, &y_pred, proba.as_ref())?;
        info!(
            samples = report.n_samples,
            accuracy = report.accuracy,
            fatal_recall = report.fatal.recall,
            roc_auc = ?report.roc_auc,
            "evaluated ensemble"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_report_text_sections() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let pred = array![0.0, 1.0, 1.0, 1.0];
        let proba = array![0.1, 0.6, 0.7, 0.9];

        let report = EvaluationReport::compute(&y, &pred, Some(&proba)).unwrap();
        assert_eq!(report.accuracy, 0.75);
        assert_eq!(report.roc_auc, Some(1.0));

        let text = report.to_text();
        assert!(text.contains("Accuracy: 0.7500"));
        assert!(text.contains("Non-Fatal"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("ROC-AUC: 1.0000"));
    }

    #[test]
    fn test_report_without_probabilities() {
        let y = array![0.0, 1.0];
        let report = EvaluationReport::compute(&y, &y, None).unwrap();
        assert!(report.roc_auc.is_none());
        assert!(!report.to_text().contains("ROC-AUC"));
    }

    #[test]
    fn test_rejects_training_role() {
        let data = Dataset::training(array![[0.0], [1.0]], array![0.0, 1.0]).unwrap();
        let model = VotingEnsemble::new(vec![]);
        let err = Evaluator::new().evaluate(&model, &data).unwrap_err();
        assert!(matches!(err, CollisionError::Validation(_)));
    }

    #[test]
    fn test_write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("classification_report.txt");
        let y = array![0.0, 1.0];
        EvaluationReport::compute(&y, &y, None)
            .unwrap()
            .write_to(&path)
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Accuracy"));
    }
}
