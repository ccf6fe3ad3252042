//! Collision fatality prediction
//!
//! Predicts whether a traffic collision is fatal from structured incident
//! attributes. Training and serving share one fitted preprocessing pipeline
//! whose feature layout is fingerprinted and persisted next to the model.
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Feature engineering, cleaning, encoding, scaling
//! - [`synthetic`] - SMOTE / Tomek-link rebalancing of the training split
//! - [`training`] - Ensemble members and the offline training job
//! - [`ensemble`] - Hard-voting ensemble with an explicit tie rule
//! - [`evaluation`] - Held-out metrics and the classification report
//!
//! ## Serving
//! - [`export`] - Pipeline/model artifact pair on disk
//! - [`inference`] - Request-time prediction service context
//! - [`server`] - HTTP API
//! - [`insights`] - Collision counts per district
//! - [`cli`] - Command-line interface

pub mod error;
pub mod dataset;

// Core ML modules
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod ensemble;
pub mod evaluation;

// Serving
pub mod export;
pub mod inference;
pub mod insights;
pub mod server;
pub mod cli;

pub mod utils;

pub use error::{CollisionError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CollisionError, Result};

    pub use crate::dataset::{stratified_split, Dataset, DatasetRole};

    pub use crate::preprocessing::{
        FeatureLayout, FittedPipeline, PreprocessingConfig, PreprocessingPipeline,
        UnseenCategoryReport, UNKNOWN_CATEGORY_CODE,
    };

    pub use crate::synthetic::{resample, Sampler, SamplingMethod, SMOTE, TomekLinks};

    pub use crate::training::{TrainEngine, TrainingConfig, TrainingOutcome};

    pub use crate::ensemble::{combine_votes, EnsembleConfig, TieBreak, Voter, VotingEnsemble};

    pub use crate::evaluation::{EvaluationReport, Evaluator};

    pub use crate::export::{load_artifacts, save_artifacts, LoadedArtifacts};

    pub use crate::inference::{CollisionRecord, InferenceConfig, InferenceEngine, PredictionOutput};
}
