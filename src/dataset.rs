//! Feature matrix + label pairs tagged with their role in training

use crate::error::{CollisionError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of the train/test boundary a dataset sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetRole {
    /// May be resampled and fit on
    Training,
    /// Held out; never resampled
    Evaluation,
}

/// Features, binary labels (1 = fatal) and role
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub role: DatasetRole,
}

impl Dataset {
    pub fn new(x: Array2<f64>, y: Array1<f64>, role: DatasetRole) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(CollisionError::Shape {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(CollisionError::Validation(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }
        Ok(Self { x, y, role })
    }

    pub fn training(x: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        Self::new(x, y, DatasetRole::Training)
    }

    pub fn evaluation(x: Array2<f64>, y: Array1<f64>) -> Result<Self> {
        Self::new(x, y, DatasetRole::Evaluation)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// `(non_fatal, fatal)` counts
    pub fn class_counts(&self) -> (usize, usize) {
        let fatal = self.y.iter().filter(|&&v| v == 1.0).count();
        (self.y.len() - fatal, fatal)
    }

    /// Share of the fatal class
    pub fn minority_share(&self) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        self.class_counts().1 as f64 / self.y.len() as f64
    }

    fn select(&self, indices: &[usize], role: DatasetRole) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: Array1::from_iter(indices.iter().map(|&i| self.y[i])),
            role,
        }
    }
}

/// Stratified shuffled split into `(training, evaluation)` preserving class proportions
pub fn stratified_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Dataset, Dataset)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(CollisionError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }
    let full = Dataset::training(x.clone(), y.clone())?;

    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label as i64).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let class_test = ((indices.len() as f64) * test_fraction).round().max(1.0) as usize;
        let class_test = class_test.min(indices.len().saturating_sub(1));
        let split_point = indices.len() - class_test;
        train_indices.extend_from_slice(&indices[..split_point]);
        test_indices.extend_from_slice(&indices[split_point..]);
    }

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(CollisionError::DataQuality(
            "stratified split resulted in an empty train or test set".to_string(),
        ));
    }

    train_indices.shuffle(&mut rng);
    test_indices.sort_unstable();

    Ok((
        full.select(&train_indices, DatasetRole::Training),
        full.select(&test_indices, DatasetRole::Evaluation),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n_fatal: usize, n_non_fatal: usize) -> (Array2<f64>, Array1<f64>) {
        let n = n_fatal + n_non_fatal;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array1::from_iter((0..n).map(|i| if i < n_fatal { 1.0 } else { 0.0 }));
        (x, y)
    }

    #[test]
    fn test_split_preserves_proportions() {
        let (x, y) = toy(50, 450);
        let (train, test) = stratified_split(&x, &y, 0.2, 48).unwrap();

        assert_eq!(train.n_samples() + test.n_samples(), 500);
        assert_eq!(test.class_counts(), (90, 10));
        assert_eq!(train.class_counts(), (360, 40));
        assert_eq!(train.role, DatasetRole::Training);
        assert_eq!(test.role, DatasetRole::Evaluation);
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = toy(10, 30);
        let (a, _) = stratified_split(&x, &y, 0.25, 7).unwrap();
        let (b, _) = stratified_split(&x, &y, 0.25, 7).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let x = Array2::zeros((2, 1));
        let y = Array1::from_vec(vec![0.0, 2.0]);
        assert!(Dataset::training(x, y).is_err());
    }

    #[test]
    fn test_rejects_bad_fraction() {
        let (x, y) = toy(5, 5);
        assert!(stratified_split(&x, &y, 1.5, 48).is_err());
    }
}
