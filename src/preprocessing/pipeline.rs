//! Fit-once / transform-many preprocessing pipeline
//!
//! `FeatureEngineer -> DataCleaner -> Scaler (optional)`. Fitting produces an
//! immutable [`FittedPipeline`] whose output columns always follow its
//! [`FeatureLayout`], whatever the column order of the input frame.

use super::cleaner::DataCleaner;
use super::config::PreprocessingConfig;
use super::encoder::{EncodingTable, UnseenCategoryReport};
use super::feature_engineer::FeatureEngineer;
use super::frame::to_matrix;
use super::scaler::{Scaler, ScalerParams, ScalerType};
use crate::error::{CollisionError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Version of the persisted pipeline/model format
pub const FORMAT_VERSION: u32 = 1;

/// Ordered feature names plus a fingerprint of everything that shapes them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub columns: Vec<String>,
    pub fingerprint: String,
}

impl FeatureLayout {
    fn compute(
        columns: Vec<String>,
        tables: &BTreeMap<String, EncodingTable>,
        scaler: Option<&BTreeMap<String, ScalerParams>>,
    ) -> Result<Self> {
        #[derive(Serialize)]
        struct Fingerprinted<'a> {
            version: u32,
            columns: &'a [String],
            tables: &'a BTreeMap<String, EncodingTable>,
            scaler: Option<&'a BTreeMap<String, ScalerParams>>,
        }

        let bytes = serde_json::to_vec(&Fingerprinted {
            version: FORMAT_VERSION,
            columns: &columns,
            tables,
            scaler,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let fingerprint = format!("{:x}", hasher.finalize());

        Ok(Self {
            columns,
            fingerprint,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Unfitted pipeline
#[derive(Debug, Clone, Default)]
pub struct PreprocessingPipeline {
    config: PreprocessingConfig,
}

impl PreprocessingPipeline {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Fit every stage on a labelled raw frame
    pub fn fit(&self, df: &DataFrame) -> Result<FittedPipeline> {
        let start = Instant::now();
        if df.height() == 0 {
            return Err(CollisionError::DataQuality(
                "cannot fit the preprocessing pipeline on an empty frame".to_string(),
            ));
        }

        let mut engineer = FeatureEngineer::new();
        let engineered = engineer.fit_transform(df)?;

        let mut cleaner = DataCleaner::new();
        let cleaned = cleaner.fit_transform(&engineered)?;
        let columns = cleaner.columns().to_vec();

        let scaler = match self.config.scaler_type() {
            ScalerType::Standard => {
                let mut scaler = Scaler::new(ScalerType::Standard);
                scaler.fit(&cleaned.frame, &columns)?;
                Some(scaler)
            }
            ScalerType::None => None,
        };

        let layout = FeatureLayout::compute(
            columns,
            cleaner.encoder().tables(),
            scaler.as_ref().map(|s| s.params()),
        )?;

        info!(
            rows = df.height(),
            features = layout.len(),
            scaled = scaler.is_some(),
            fingerprint = %layout.fingerprint,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fitted preprocessing pipeline"
        );

        Ok(FittedPipeline {
            config: self.config.clone(),
            engineer,
            cleaner,
            scaler,
            layout,
        })
    }
}

/// Frozen pipeline state, shared by training and inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    config: PreprocessingConfig,
    engineer: FeatureEngineer,
    cleaner: DataCleaner,
    scaler: Option<Scaler>,
    layout: FeatureLayout,
}

impl FittedPipeline {
    /// Feature matrix for a raw frame; an `ACCLASS` column, if any, is validated and ignored
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        self.transform_with_report(df).map(|(x, _)| x)
    }

    /// Feature matrix plus the unseen-category fallbacks it took
    pub fn transform_with_report(&self, df: &DataFrame) -> Result<(Array2<f64>, UnseenCategoryReport)> {
        let (x, _, report) = self.run(df)?;
        Ok((x, report))
    }

    /// Feature matrix and mapped target for a labelled raw frame
    pub fn transform_with_target(&self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        let (x, y, _) = self.run(df)?;
        let y = y.ok_or_else(|| {
            CollisionError::Schema(format!(
                "expected column '{}' is missing",
                super::schema::TARGET
            ))
        })?;
        Ok((x, y))
    }

    fn run(&self, df: &DataFrame) -> Result<(Array2<f64>, Option<Array1<f64>>, UnseenCategoryReport)> {
        let engineered = self.engineer.transform(df)?;
        let cleaned = self.cleaner.transform(&engineered)?;

        let frame = match &self.scaler {
            Some(scaler) => scaler.transform(&cleaned.frame)?,
            None => cleaned.frame,
        };

        let x = to_matrix(&frame, &self.layout.columns)?;
        Ok((x, cleaned.target, cleaned.unseen))
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn cleaner(&self) -> &DataCleaner {
        &self.cleaner
    }

    /// Recompute the fingerprint from the stored state and compare
    pub fn verify_layout(&self) -> Result<()> {
        let recomputed = FeatureLayout::compute(
            self.cleaner.columns().to_vec(),
            self.cleaner.encoder().tables(),
            self.scaler.as_ref().map(|s| s.params()),
        )?;
        if recomputed != self.layout {
            return Err(CollisionError::ArtifactMismatch(
                "pipeline layout fingerprint does not match its fitted state".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let pipeline: Self = serde_json::from_str(&json)?;
        Ok(pipeline)
    }
}
