//! Offline training job
//!
//! Fits the preprocessing pipeline, splits the transformed data, resamples
//! only the training side, fits the voting ensemble and scores it on the
//! untouched evaluation side. Nothing is persisted here; a failed run
//! leaves no artifacts behind.

use super::TrainingConfig;
use crate::dataset::stratified_split;
use crate::ensemble::VotingEnsemble;
use crate::error::Result;
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::preprocessing::{FittedPipeline, PreprocessingPipeline};
use crate::synthetic::resample;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Row counts along the way, `(non_fatal, fatal)` where split by class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_rows: usize,
    pub n_features: usize,
    pub train_counts: (usize, usize),
    pub resampled_counts: (usize, usize),
    pub test_counts: (usize, usize),
    pub resampled_minority_share: f64,
    pub training_time_secs: f64,
}

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: FittedPipeline,
    pub ensemble: VotingEnsemble,
    pub report: EvaluationReport,
    pub summary: TrainingSummary,
}

/// Runs the training job for one configuration
#[derive(Debug, Clone, Default)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on a labelled raw collision frame
    pub fn run(&self, df: &DataFrame) -> Result<TrainingOutcome> {
        let start = Instant::now();

        let pipeline = PreprocessingPipeline::new(self.config.preprocessing.clone()).fit(df)?;
        let (x, y) = pipeline.transform_with_target(df)?;

        let (train, test) = stratified_split(&x, &y, self.config.test_fraction, self.config.seed)?;
        let train_counts = train.class_counts();
        info!(
            train = train.n_samples(),
            test = test.n_samples(),
            train_fatal = train_counts.1,
            "split dataset"
        );

        let resampled = resample(&train, self.config.sampling, self.config.seed)?;
        let resampled_counts = resampled.class_counts();

        let mut ensemble = VotingEnsemble::from_config(&self.config.ensemble);
        ensemble.fit(&resampled.x, &resampled.y)?;

        let report = Evaluator::new().evaluate(&ensemble, &test)?;

        let summary = TrainingSummary {
            n_rows: x.nrows(),
            n_features: x.ncols(),
            train_counts,
            resampled_counts,
            test_counts: test.class_counts(),
            resampled_minority_share: resampled.minority_share(),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            rows = summary.n_rows,
            features = summary.n_features,
            accuracy = report.accuracy,
            minority_share = summary.resampled_minority_share,
            elapsed_secs = summary.training_time_secs,
            "training complete"
        );

        Ok(TrainingOutcome {
            pipeline,
            ensemble,
            report,
            summary,
        })
    }
}
