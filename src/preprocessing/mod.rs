//! Data preprocessing module
//!
//! Turns raw collision records into the feature matrix the ensemble is fit on:
//! - Date/time decomposition ([`FeatureEngineer`])
//! - Column dropping, NA fill, YES/NO mapping, categorical encoding ([`DataCleaner`])
//! - Optional z-score scaling ([`Scaler`])
//! - The fitted, serializable composition of the three ([`FittedPipeline`])

mod cleaner;
mod config;
mod encoder;
mod feature_engineer;
pub mod frame;
mod pipeline;
mod scaler;
pub mod schema;

pub use cleaner::{map_binary, map_target, CleanedFrame, DataCleaner};
pub use config::PreprocessingConfig;
pub use encoder::{CategoryEncoder, EncodingTable, UnseenCategoryReport, UNKNOWN_CATEGORY_CODE};
pub use feature_engineer::{parse_date, parse_hhmm, FeatureEngineer};
pub use pipeline::{FeatureLayout, FittedPipeline, PreprocessingPipeline, FORMAT_VERSION};
pub use scaler::{Scaler, ScalerParams, ScalerType};
