//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for request-time prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Reject a record when more of its categorical fields than this fall
    /// back to the unknown code; `None` accepts any number
    pub max_unseen_categories: Option<usize>,

    /// Output the fatal probability when every voter supports it
    pub output_probabilities: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_unseen_categories: None,
            output_probabilities: true,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_unseen_categories(mut self, max: Option<usize>) -> Self {
        self.max_unseen_categories = max;
        self
    }

    pub fn with_probabilities(mut self, enabled: bool) -> Self {
        self.output_probabilities = enabled;
        self
    }
}
