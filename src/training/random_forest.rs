//! Random Forest classifier

use super::class_weight::{balanced_class_weights, ClassWeight};
use super::decision_tree::DecisionTree;
use crate::error::{CollisionError, Result};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest model; each tree sees a bootstrap sample and
/// `floor(sqrt(n_features))` candidate features per split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub class_weight: ClassWeight,
    pub random_state: u64,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            class_weight: ClassWeight::None,
            random_state: 42,
        }
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn compute_max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt().floor() as usize).max(1)
    }

    /// Fit the forest; trees are built in parallel, each from its own seed
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(CollisionError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(CollisionError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let max_features = Self::compute_max_features(n_features);

        // Class weights come from the full training labels, not each bootstrap
        let (w0, w1) = match self.class_weight {
            ClassWeight::Balanced => balanced_class_weights(y),
            ClassWeight::None => (1.0, 1.0),
        };
        let base_seed = self.random_state;

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap as per-row draw counts
                let mut counts = vec![0.0; n_samples];
                for _ in 0..n_samples {
                    counts[rng.gen_range(0..n_samples)] += 1.0;
                }

                let weights = Array1::from_iter(
                    counts
                        .iter()
                        .zip(y.iter())
                        .map(|(&c, &label)| c * if label == 1.0 { w1 } else { w0 }),
                );

                let mut tree = DecisionTree::new()
                    .with_max_features(max_features)
                    .with_random_state(rng.gen());
                tree.fit_weighted(x, y, &weights)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(self)
    }

    /// Mean of the trees' fatal probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CollisionError::ModelNotFitted);
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::zeros(x.nrows());
        for p in &per_tree {
            sum += p;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Class labels from the averaged probability; 0.5 predicts non-fatal
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
