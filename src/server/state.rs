//! Application state management

use crate::inference::{InferenceConfig, InferenceEngine};
use std::path::PathBuf;
use std::time::Instant;

use super::ServerConfig;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub engine: InferenceEngine,
    /// Raw collision CSV backing the insights endpoints
    pub data_file: Option<PathBuf>,
    pub started_at: Instant,
}

impl AppState {
    /// Load artifacts named by `config`; missing artifacts leave the engine not ready
    pub fn new(config: &ServerConfig) -> Self {
        let inference = InferenceConfig::new().with_max_unseen_categories(config.max_unseen_categories);
        Self::with_engine(
            InferenceEngine::load(&config.artifacts_dir, inference),
            config.data_file.clone(),
        )
    }

    pub fn with_engine(engine: InferenceEngine, data_file: Option<PathBuf>) -> Self {
        Self {
            engine,
            data_file,
            started_at: Instant::now(),
        }
    }
}
