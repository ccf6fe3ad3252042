//! Request-time prediction service context
//!
//! The engine owns the loaded artifact pair behind an `Arc` and is shared
//! read-only by every request. The only mutable state is the atomic
//! counters in [`Counters`].

use super::record::{records_to_frame, CollisionRecord};
use super::stats::{Counters, InferenceStats};
use super::InferenceConfig;
use crate::error::{CollisionError, Result};
use crate::export::{load_artifacts, LoadedArtifacts, Manifest};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Labels and optional fatal probabilities, one per record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub prediction: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_proba_fatal: Option<Vec<f64>>,
}

/// Prediction service context
#[derive(Debug)]
pub struct InferenceEngine {
    config: InferenceConfig,
    artifacts: Option<Arc<LoadedArtifacts>>,
    counters: Counters,
}

impl InferenceEngine {
    /// An engine without artifacts; every prediction fails with `ServiceNotReady`
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            artifacts: None,
            counters: Counters::default(),
        }
    }

    pub fn with_artifacts(mut self, artifacts: LoadedArtifacts) -> Self {
        self.artifacts = Some(Arc::new(artifacts));
        self
    }

    /// Load artifacts from `dir`; a missing or mismatched pair leaves the engine not ready
    pub fn load(dir: impl AsRef<Path>, config: InferenceConfig) -> Self {
        let dir = dir.as_ref();
        match load_artifacts(dir) {
            Ok(artifacts) => Self::new(config).with_artifacts(artifacts),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "artifacts unavailable, serving not ready");
                Self::new(config)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.artifacts.as_deref().map(|a| &a.manifest)
    }

    pub fn stats(&self) -> InferenceStats {
        self.counters.snapshot()
    }

    /// Predict a batch of typed records
    pub fn predict_records(&self, records: &[CollisionRecord]) -> Result<PredictionOutput> {
        self.counters.request(records.len());
        let result = records_to_frame(records).and_then(|df| self.predict_inner(&df));
        if result.is_err() {
            self.counters.failure();
        }
        result
    }

    /// Predict every row of a raw frame
    pub fn predict_frame(&self, df: &DataFrame) -> Result<PredictionOutput> {
        self.counters.request(df.height());
        let result = self.predict_inner(df);
        if result.is_err() {
            self.counters.failure();
        }
        result
    }

    fn predict_inner(&self, df: &DataFrame) -> Result<PredictionOutput> {
        let start = Instant::now();
        let artifacts = self.artifacts.as_deref().ok_or(CollisionError::ServiceNotReady)?;

        let (x, unseen) = artifacts.pipeline.transform_with_report(df)?;
        if !unseen.is_empty() {
            self.counters.unseen(unseen.total());
            warn!(
                total = unseen.total(),
                columns = ?unseen.by_column,
                "unseen categories mapped to the unknown code"
            );
        }
        if let Some(max) = self.config.max_unseen_categories {
            if unseen.max_per_row() > max {
                self.counters.rejection();
                return Err(CollisionError::DataQuality(format!(
                    "a record has {} unseen categorical values, at most {} allowed",
                    unseen.max_per_row(),
                    max
                )));
            }
        }

        let ensemble = artifacts.ensemble();
        let labels = ensemble.predict(&x)?;
        let proba = if self.config.output_probabilities && ensemble.supports_proba() {
            Some(ensemble.predict_proba(&x)?.to_vec())
        } else {
            None
        };

        debug!(
            rows = x.nrows(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "prediction complete"
        );
        info!(rows = x.nrows(), fatal = labels.iter().filter(|&&l| l == 1.0).count(), "predicted");

        Ok(PredictionOutput {
            prediction: labels.iter().map(|&l| if l == 1.0 { 1 } else { 0 }).collect(),
            prediction_proba_fatal: proba,
        })
    }
}
