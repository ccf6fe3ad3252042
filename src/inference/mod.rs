//! Inference engine module
//!
//! Provides request-time prediction with:
//! - Strict deserialization of collision records
//! - A verified pipeline/model pair loaded once and shared
//! - Unseen-category accounting with an optional rejection limit
//! - Lock-free request statistics

mod config;
mod engine;
mod record;
mod stats;

pub use config::InferenceConfig;
pub use engine::{InferenceEngine, PredictionOutput};
pub use record::{records_to_frame, CollisionRecord, NumberOrText};
pub use stats::InferenceStats;
