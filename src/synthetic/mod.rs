//! Class rebalancing for the training split
//!
//! Provides:
//! - SMOTE over-sampling of the fatal class
//! - Tomek-link under-sampling of the majority class
//! - Their combination, SMOTE followed by Tomek cleaning
//!
//! Only [`DatasetRole::Training`] data may be resampled.

mod smote;
mod tomek;

pub use smote::SMOTE;
pub use tomek::TomekLinks;

use crate::dataset::{Dataset, DatasetRole};
use crate::error::{CollisionError, Result};
use clap::ValueEnum;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<f64>,
    /// Synthetic rows added
    pub n_synthetic: usize,
    /// Original rows removed
    pub n_removed: usize,
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Rebalancing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    None,
    Smote,
    #[value(name = "tomek", alias = "tomek-links")]
    TomekLinks,
    #[default]
    SmoteTomek,
}

/// Rebalance a training dataset.
///
/// The minority count never decreases. Evaluation data is refused.
pub fn resample(dataset: &Dataset, method: SamplingMethod, seed: u64) -> Result<Dataset> {
    if dataset.role != DatasetRole::Training {
        return Err(CollisionError::Validation(
            "resampling is only allowed on training data".to_string(),
        ));
    }

    let before = dataset.class_counts();
    let result = match method {
        SamplingMethod::None => ResampleResult {
            x: dataset.x.clone(),
            y: dataset.y.clone(),
            n_synthetic: 0,
            n_removed: 0,
        },
        SamplingMethod::Smote => SMOTE::new().with_seed(seed).fit_resample(&dataset.x, &dataset.y)?,
        SamplingMethod::TomekLinks => TomekLinks::new().fit_resample(&dataset.x, &dataset.y)?,
        SamplingMethod::SmoteTomek => {
            let over = SMOTE::new().with_seed(seed).fit_resample(&dataset.x, &dataset.y)?;
            let cleaned = TomekLinks::new().fit_resample(&over.x, &over.y)?;
            ResampleResult {
                n_synthetic: over.n_synthetic,
                ..cleaned
            }
        }
    };

    let out = Dataset::training(result.x, result.y)?;
    let after = out.class_counts();
    info!(
        method = ?method,
        non_fatal_before = before.0,
        fatal_before = before.1,
        non_fatal_after = after.0,
        fatal_after = after.1,
        synthetic = result.n_synthetic,
        removed = result.n_removed,
        "resampled training split"
    );
    Ok(out)
}

/// Get class distribution
pub fn class_counts(y: &Array1<f64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label as i64).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label as i64).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// Squared Euclidean distance
pub(crate) fn sq_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
}

/// Distance/index pair ordered by distance then index, for BinaryHeap partial sorts
#[derive(Debug, Clone, Copy)]
pub(crate) struct DistIdx(pub f64, pub usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> Dataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            rows.extend_from_slice(&[i as f64 * 0.1, 0.0]);
            labels.push(0.0);
        }
        for i in 0..8 {
            rows.extend_from_slice(&[10.0 + i as f64 * 0.1, 5.0]);
            labels.push(1.0);
        }
        let x = Array2::from_shape_vec((48, 2), rows).unwrap();
        Dataset::training(x, Array1::from_vec(labels)).unwrap()
    }

    #[test]
    fn test_resample_refuses_evaluation_data() {
        let mut ds = imbalanced();
        ds.role = DatasetRole::Evaluation;
        let err = resample(&ds, SamplingMethod::SmoteTomek, 48).unwrap_err();
        assert!(matches!(err, CollisionError::Validation(_)));
    }

    #[test]
    fn test_minority_never_shrinks() {
        let ds = imbalanced();
        for method in [
            SamplingMethod::None,
            SamplingMethod::Smote,
            SamplingMethod::TomekLinks,
            SamplingMethod::SmoteTomek,
        ] {
            let out = resample(&ds, method, 48).unwrap();
            assert!(out.class_counts().1 >= 8, "{:?}", method);
        }
    }

    #[test]
    fn test_smote_tomek_balances() {
        let out = resample(&imbalanced(), SamplingMethod::SmoteTomek, 48).unwrap();
        let (non_fatal, fatal) = out.class_counts();
        assert_eq!(fatal, 40);
        assert!(non_fatal <= 40);
    }

    #[test]
    fn test_parse_method() {
        let parse = |s: &str| SamplingMethod::from_str(s, true);
        assert_eq!(parse("smote-tomek").unwrap(), SamplingMethod::SmoteTomek);
        assert_eq!(parse("SMOTE").unwrap(), SamplingMethod::Smote);
        assert_eq!(parse("tomek").unwrap(), SamplingMethod::TomekLinks);
        assert_eq!(parse("tomek-links").unwrap(), SamplingMethod::TomekLinks);
        assert!(parse("adasyn").is_err());
    }

    #[test]
    fn test_dist_idx_breaks_ties_by_index() {
        assert!(DistIdx(1.0, 2) < DistIdx(1.0, 3));
        assert!(DistIdx(0.5, 9) < DistIdx(1.0, 0));
    }
}
