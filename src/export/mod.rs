//! Artifact persistence
//!
//! A trained model is stored as a directory holding three JSON files:
//! - `pipeline.json`, the fitted preprocessing pipeline
//! - `model.json`, the voting ensemble and the layout it was fit on
//! - `manifest.json`, format version, fingerprint, timestamps and metrics
//!
//! The pair is only ever loaded together and refused when the layout
//! fingerprints disagree.

mod artifacts;

pub use artifacts::{
    load_artifacts, save_artifacts, LoadedArtifacts, Manifest, MetricsSummary, ModelArtifact,
    MANIFEST_FILE, MODEL_FILE, PIPELINE_FILE,
};
