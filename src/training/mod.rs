//! Model training module
//!
//! Provides the ensemble members and the offline training job:
//! - K-Nearest Neighbors
//! - Weighted decision trees and Random Forests
//! - Support Vector Machines with optional Platt calibration
//! - Balanced class weighting shared by the weighted learners

mod config;
mod engine;
pub mod class_weight;
pub mod decision_tree;
pub mod knn;
pub mod platt;
pub mod random_forest;
pub mod svm;

pub use config::TrainingConfig;
pub use engine::{TrainEngine, TrainingOutcome, TrainingSummary};
pub use class_weight::{balanced_class_weights, balanced_sample_weights, ClassWeight};
pub use decision_tree::{DecisionTree, TreeNode};
pub use knn::{KNNClassifier, KNNConfig};
pub use platt::PlattScaling;
pub use random_forest::RandomForest;
pub use svm::{SVMClassifier, SVMConfig};
