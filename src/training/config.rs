//! Training job configuration

use crate::ensemble::{EnsembleConfig, TieBreak};
use crate::preprocessing::schema::RANDOM_STATE;
use crate::preprocessing::PreprocessingConfig;
use crate::synthetic::SamplingMethod;
use serde::{Deserialize, Serialize};

/// Settings of one offline training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of each class held out for evaluation
    pub test_fraction: f64,
    /// Seed for the split and the resampler
    pub seed: u64,
    pub sampling: SamplingMethod,
    pub preprocessing: PreprocessingConfig,
    pub ensemble: EnsembleConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: RANDOM_STATE,
            sampling: SamplingMethod::SmoteTomek,
            preprocessing: PreprocessingConfig::default(),
            ensemble: EnsembleConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    /// Seed shared by the split, the resampler and the ensemble
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.ensemble.random_state = seed;
        self
    }

    pub fn with_sampling(mut self, method: SamplingMethod) -> Self {
        self.sampling = method;
        self
    }

    pub fn with_scaling(mut self, scale: bool) -> Self {
        self.preprocessing = self.preprocessing.with_scaling(scale);
        self
    }

    pub fn with_knn_neighbors(mut self, k: usize) -> Self {
        self.ensemble.knn_neighbors = k;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.ensemble.n_estimators = n;
        self
    }

    pub fn with_svm(mut self, include: bool) -> Self {
        self.ensemble.include_svm = include;
        self
    }

    pub fn with_svm_probability(mut self, probability: bool) -> Self {
        self.ensemble.svm_probability = probability;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.ensemble.tie_break = tie_break;
        self
    }
}
