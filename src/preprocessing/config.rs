//! Preprocessing configuration

use super::ScalerType;
use serde::{Deserialize, Serialize};

/// Configuration for the preprocessing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Z-score every feature column after cleaning
    pub scale_features: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            scale_features: false,
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable or disable feature scaling
    pub fn with_scaling(mut self, scale: bool) -> Self {
        self.scale_features = scale;
        self
    }

    pub fn scaler_type(&self) -> ScalerType {
        if self.scale_features {
            ScalerType::Standard
        } else {
            ScalerType::None
        }
    }
}
