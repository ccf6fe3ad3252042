//! SMOTE over-sampling

use crate::error::{CollisionError, Result};
use crate::preprocessing::schema::RANDOM_STATE;
use crate::synthetic::{class_counts, class_indices, sq_distance, DistIdx, ResampleResult, Sampler};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BinaryHeap};

/// SMOTE (Synthetic Minority Over-sampling Technique)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors within the class
    k_neighbors: usize,
    /// Random seed
    seed: u64,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: RANDOM_STATE,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// k nearest neighbours of `data[point]` within `data`, excluding itself
    fn find_neighbors(point: usize, data: &[Vec<f64>], k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, d) in data.iter().enumerate() {
            if i == point {
                continue;
            }
            let candidate = DistIdx(sq_distance(&data[point], d), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(&worst) = heap.peek() {
                if candidate < worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Generate synthetic sample between two points
    fn generate_sample(point: &[f64], neighbor: &[f64], rng: &mut ChaCha8Rng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(CollisionError::Validation(
                "SMOTE needs both fatal and non-fatal samples".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        self.target_counts = Some(counts.keys().map(|&class| (class, max_count)).collect());
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| CollisionError::Validation("SMOTE not fitted".to_string()))?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let counts = class_counts(y);
        let n_features = x.ncols();

        // Only synthetic rows are collected; originals are copied from x
        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<f64> = Vec::new();

        for (&class, &target_count) in targets {
            let current_count = counts.get(&class).copied().unwrap_or(0);
            let n_to_generate = target_count.saturating_sub(current_count);
            if n_to_generate == 0 {
                continue;
            }

            let class_samples: Vec<Vec<f64>> = indices
                .get(&class)
                .map(|idx| idx.iter().map(|&i| x.row(i).to_vec()).collect())
                .unwrap_or_default();

            if class_samples.len() < 2 {
                return Err(CollisionError::Validation(format!(
                    "SMOTE needs at least 2 samples of class {}, found {}",
                    class,
                    class_samples.len()
                )));
            }

            let k = self.k_neighbors.min(class_samples.len() - 1);
            let neighbors: Vec<Vec<usize>> = (0..class_samples.len())
                .map(|i| Self::find_neighbors(i, &class_samples, k))
                .collect();

            for _ in 0..n_to_generate {
                let idx = rng.gen_range(0..class_samples.len());
                let neighbor_idx = neighbors[idx][rng.gen_range(0..neighbors[idx].len())];

                synthetic_x.push(Self::generate_sample(
                    &class_samples[idx],
                    &class_samples[neighbor_idx],
                    &mut rng,
                ));
                synthetic_y.push(class as f64);
            }
        }

        let n_original = x.nrows();
        let n_total = n_original + synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<f64> = y.to_vec();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic: synthetic_x.len(),
            n_removed: 0,
        })
    }
}
