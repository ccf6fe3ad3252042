//! Hard-voting ensemble over heterogeneous voters

use super::EnsembleConfig;
use crate::error::{CollisionError, Result};
use crate::training::{
    ClassWeight, DecisionTree, KNNClassifier, RandomForest, SVMClassifier, SVMConfig,
};
use clap::ValueEnum;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Rule applied when fatal and non-fatal votes are equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lowest class index wins
    #[default]
    NonFatal,
    Fatal,
    /// Refuse to decide
    Reject,
}

/// One ensemble member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Voter {
    Knn(KNNClassifier),
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    Svm(SVMClassifier),
}

impl Voter {
    pub fn name(&self) -> &'static str {
        match self {
            Voter::Knn(_) => "knn",
            Voter::RandomForest(_) => "random_forest",
            Voter::DecisionTree(_) => "decision_tree",
            Voter::Svm(_) => "svm",
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Voter::Knn(m) => m.fit(x, y).map(|_| ()),
            Voter::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Voter::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Voter::Svm(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Voter::Knn(m) => m.predict(x),
            Voter::RandomForest(m) => m.predict(x),
            Voter::DecisionTree(m) => m.predict(x),
            Voter::Svm(m) => m.predict(x),
        }
    }

    pub fn supports_proba(&self) -> bool {
        match self {
            Voter::Svm(m) => m.supports_proba(),
            _ => true,
        }
    }

    /// Fatal-class probability
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Voter::Knn(m) => m.predict_proba(x),
            Voter::RandomForest(m) => m.predict_proba(x),
            Voter::DecisionTree(m) => m.predict_proba(x),
            Voter::Svm(m) => m.predict_proba(x),
        }
    }
}

/// Combine per-voter label vectors (one `Vec` per voter) into one decision per row
pub fn combine_votes(votes: &[Vec<f64>], tie_break: TieBreak) -> Result<Array1<f64>> {
    let first = votes
        .first()
        .ok_or_else(|| CollisionError::Validation("no voter predictions provided".to_string()))?;
    let n_samples = first.len();
    if votes.iter().any(|v| v.len() != n_samples) {
        return Err(CollisionError::Shape {
            expected: format!("{} predictions per voter", n_samples),
            actual: "voters disagree on row count".to_string(),
        });
    }

    let mut result = Array1::zeros(n_samples);
    for i in 0..n_samples {
        let fatal = votes.iter().filter(|v| v[i] == 1.0).count();
        let non_fatal = votes.len() - fatal;

        result[i] = match fatal.cmp(&non_fatal) {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => 0.0,
            std::cmp::Ordering::Equal => match tie_break {
                TieBreak::NonFatal => 0.0,
                TieBreak::Fatal => 1.0,
                TieBreak::Reject => {
                    return Err(CollisionError::Validation(format!(
                        "tied vote ({} fatal, {} non-fatal) at row {}",
                        fatal, non_fatal, i
                    )))
                }
            },
        };
    }

    Ok(result)
}

/// Hard-voting classifier: one vote per member, majority wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnsemble {
    voters: Vec<Voter>,
    tie_break: TieBreak,
    n_features: Option<usize>,
}

impl VotingEnsemble {
    pub fn new(voters: Vec<Voter>) -> Self {
        Self {
            voters,
            tie_break: TieBreak::default(),
            n_features: None,
        }
    }

    /// KNN, balanced random forest, balanced gini tree and optionally a balanced RBF SVM
    pub fn from_config(config: &EnsembleConfig) -> Self {
        let mut voters = vec![
            Voter::Knn(KNNClassifier::with_k(config.knn_neighbors)),
            Voter::RandomForest(
                RandomForest::new(config.n_estimators)
                    .with_class_weight(ClassWeight::Balanced)
                    .with_random_state(config.random_state),
            ),
            Voter::DecisionTree(
                DecisionTree::new()
                    .with_class_weight(ClassWeight::Balanced)
                    .with_random_state(config.random_state),
            ),
        ];
        if config.include_svm {
            voters.push(Voter::Svm(SVMClassifier::new(SVMConfig {
                probability: config.svm_probability,
                random_state: config.random_state,
                ..Default::default()
            })));
        }
        Self::new(voters).with_tie_break(config.tie_break)
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn voters(&self) -> &[Voter] {
        &self.voters
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features.is_some()
    }

    /// Number of features seen at fit time
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if self.voters.is_empty() {
            return Err(CollisionError::Validation("ensemble has no voters".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(CollisionError::Shape {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        for voter in &mut self.voters {
            let start = Instant::now();
            voter.fit(x, y)?;
            info!(
                voter = voter.name(),
                rows = x.nrows(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "fitted voter"
            );
        }

        self.n_features = Some(x.ncols());
        Ok(self)
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        let expected = self.n_features.ok_or(CollisionError::ModelNotFitted)?;
        if x.ncols() != expected {
            return Err(CollisionError::Shape {
                expected: format!("{} features", expected),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Per-voter label vectors
    pub fn votes(&self, x: &Array2<f64>) -> Result<Vec<Vec<f64>>> {
        self.check_input(x)?;
        self.voters
            .iter()
            .map(|v| v.predict(x).map(|p| p.to_vec()))
            .collect()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let votes = self.votes(x)?;
        debug!(voters = votes.len(), rows = x.nrows(), "combining votes");
        self.combine_votes(&votes)
    }

    /// Apply this ensemble's tie rule to externally produced votes
    pub fn combine_votes(&self, votes: &[Vec<f64>]) -> Result<Array1<f64>> {
        combine_votes(votes, self.tie_break)
    }

    pub fn supports_proba(&self) -> bool {
        self.voters.iter().all(Voter::supports_proba)
    }

    /// Mean of the voters' fatal probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if let Some(v) = self.voters.iter().find(|v| !v.supports_proba()) {
            return Err(CollisionError::ProbabilityUnsupported(format!(
                "voter '{}' does not produce probabilities",
                v.name()
            )));
        }
        self.check_input(x)?;

        let mut sum = Array1::zeros(x.nrows());
        for voter in &self.voters {
            sum += &voter.predict_proba(x)?;
        }
        Ok(sum / self.voters.len() as f64)
    }
}
