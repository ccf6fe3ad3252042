//! Matched pipeline/model artifact pair on disk

use crate::ensemble::{TieBreak, VotingEnsemble};
use crate::error::{CollisionError, Result};
use crate::evaluation::EvaluationReport;
use crate::preprocessing::{FeatureLayout, FittedPipeline, FORMAT_VERSION};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PIPELINE_FILE: &str = "pipeline.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Fitted ensemble bound to the layout it was trained on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub layout: FeatureLayout,
    pub ensemble: VotingEnsemble,
}

/// Headline numbers from the held-out evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub n_test: usize,
    pub accuracy: f64,
    pub fatal_precision: f64,
    pub fatal_recall: f64,
    pub fatal_f1: f64,
    pub roc_auc: Option<f64>,
    pub average_precision: Option<f64>,
}

impl From<&EvaluationReport> for MetricsSummary {
    fn from(report: &EvaluationReport) -> Self {
        Self {
            n_test: report.n_samples,
            accuracy: report.accuracy,
            fatal_precision: report.fatal.precision,
            fatal_recall: report.fatal.recall,
            fatal_f1: report.fatal.f1,
            roc_auc: report.roc_auc,
            average_precision: report.average_precision,
        }
    }
}

/// Description of a saved artifact pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub fingerprint: String,
    pub n_features: usize,
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
    pub voters: Vec<String>,
    pub tie_break: TieBreak,
    pub supports_proba: bool,
    pub metrics: Option<MetricsSummary>,
}

/// A verified pipeline/model pair ready for inference
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub pipeline: FittedPipeline,
    pub model: ModelArtifact,
    pub manifest: Manifest,
}

impl LoadedArtifacts {
    pub fn ensemble(&self) -> &VotingEnsemble {
        &self.model.ensemble
    }

    pub fn layout(&self) -> &FeatureLayout {
        self.pipeline.layout()
    }
}

/// Persist the pair into `dir`.
///
/// All three files are first written under temporary names and only renamed
/// once every write succeeded.
pub fn save_artifacts(
    dir: impl AsRef<Path>,
    pipeline: &FittedPipeline,
    ensemble: &VotingEnsemble,
    report: Option<&EvaluationReport>,
) -> Result<Manifest> {
    let dir = dir.as_ref();
    let layout = pipeline.layout();

    match ensemble.n_features() {
        Some(n) if n == layout.len() => {}
        Some(n) => {
            return Err(CollisionError::ArtifactMismatch(format!(
                "ensemble was fit on {} features but the pipeline produces {}",
                n,
                layout.len()
            )))
        }
        None => return Err(CollisionError::ModelNotFitted),
    }

    let model = ModelArtifact {
        format_version: FORMAT_VERSION,
        layout: layout.clone(),
        ensemble: ensemble.clone(),
    };
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        fingerprint: layout.fingerprint.clone(),
        n_features: layout.len(),
        created_at: Utc::now(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        voters: ensemble.voters().iter().map(|v| v.name().to_string()).collect(),
        tie_break: ensemble.tie_break(),
        supports_proba: ensemble.supports_proba(),
        metrics: report.map(MetricsSummary::from),
    };

    fs::create_dir_all(dir)?;
    let staged = [
        (PIPELINE_FILE, serde_json::to_string_pretty(pipeline)?),
        (MODEL_FILE, serde_json::to_string_pretty(&model)?),
        (MANIFEST_FILE, serde_json::to_string_pretty(&manifest)?),
    ];

    let mut temps: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(staged.len());
    for (name, json) in &staged {
        let tmp = dir.join(format!(".{}.tmp", name));
        if let Err(e) = fs::write(&tmp, json) {
            for (t, _) in &temps {
                let _ = fs::remove_file(t);
            }
            return Err(e.into());
        }
        temps.push((tmp, dir.join(name)));
    }
    for (tmp, target) in &temps {
        fs::rename(tmp, target)?;
    }

    info!(
        dir = %dir.display(),
        fingerprint = %manifest.fingerprint,
        features = manifest.n_features,
        "saved artifacts"
    );
    Ok(manifest)
}

/// Load and cross-check the pair stored in `dir`
pub fn load_artifacts(dir: impl AsRef<Path>) -> Result<LoadedArtifacts> {
    let dir = dir.as_ref();

    let pipeline: FittedPipeline = read_json(dir, PIPELINE_FILE)?;
    let model: ModelArtifact = read_json(dir, MODEL_FILE)?;
    let manifest: Manifest = read_json(dir, MANIFEST_FILE)?;

    for (what, version) in [("model", model.format_version), ("manifest", manifest.format_version)] {
        if version != FORMAT_VERSION {
            return Err(CollisionError::ArtifactMismatch(format!(
                "{} format version {} is not supported (expected {})",
                what, version, FORMAT_VERSION
            )));
        }
    }

    pipeline.verify_layout()?;
    let layout = pipeline.layout();
    if model.layout != *layout {
        return Err(CollisionError::ArtifactMismatch(format!(
            "model was trained on layout {} but the pipeline has {}",
            model.layout.fingerprint, layout.fingerprint
        )));
    }
    if manifest.fingerprint != layout.fingerprint {
        return Err(CollisionError::ArtifactMismatch(format!(
            "manifest fingerprint {} does not match pipeline {}",
            manifest.fingerprint, layout.fingerprint
        )));
    }
    if model.ensemble.n_features() != Some(layout.len()) {
        return Err(CollisionError::ArtifactMismatch(format!(
            "model expects {:?} features, pipeline produces {}",
            model.ensemble.n_features(),
            layout.len()
        )));
    }

    info!(
        dir = %dir.display(),
        fingerprint = %layout.fingerprint,
        created_at = %manifest.created_at.to_rfc3339(),
        "loaded artifacts"
    );
    Ok(LoadedArtifacts {
        pipeline,
        model,
        manifest,
    })
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(CollisionError::ArtifactMismatch(format!(
            "missing artifact file {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), "reading artifact");
    let json = fs::read_to_string(&path)?;
    serde_json::from_str(&json).map_err(|e| {
        CollisionError::ArtifactMismatch(format!("unreadable artifact {}: {}", name, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_artifacts(dir.path()).unwrap_err();
        assert!(matches!(err, CollisionError::ArtifactMismatch(msg) if msg.contains(PIPELINE_FILE)));
    }

    #[test]
    fn test_unreadable_file_is_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PIPELINE_FILE), "{not json").unwrap();
        let err = load_artifacts(dir.path()).unwrap_err();
        assert!(matches!(err, CollisionError::ArtifactMismatch(_)));
    }
}
