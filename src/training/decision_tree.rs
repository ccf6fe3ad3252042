//! Weighted binary decision tree
//!
//! Supports per-sample weights, which carry both class balancing and forest
//! bootstrap multiplicities. Splits are found with a sorted sweep per feature.

use super::class_weight::{balanced_sample_weights, ClassWeight};
use crate::error::{CollisionError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the weighted share of the fatal class
    Leaf { proba: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Gini impurity of a node with weighted class totals `w0`, `w1`
fn gini(w0: f64, w1: f64) -> f64 {
    let total = w0 + w1;
    if total <= 0.0 {
        return 0.0;
    }
    let (p0, p1) = (w0 / total, w1 / total);
    1.0 - p0 * p0 - p1 * p1
}

/// Candidate split found for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at each node; `None` considers all of them
    pub max_features: Option<usize>,
    pub class_weight: ClassWeight,
    pub random_state: u64,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            class_weight: ClassWeight::None,
            random_state: 0,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data, applying `class_weight`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let weights = match self.class_weight {
            ClassWeight::Balanced => balanced_sample_weights(y),
            ClassWeight::None => Array1::ones(y.len()),
        };
        self.fit_weighted(x, y, &weights)
    }

    /// Fit with explicit per-sample weights; rows with zero weight are ignored
    pub fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != sample_weight.len() {
            return Err(CollisionError::Shape {
                expected: format!("{} labels and weights", n_samples),
                actual: format!("{} labels, {} weights", y.len(), sample_weight.len()),
            });
        }

        let indices: Vec<usize> = (0..n_samples).filter(|&i| sample_weight[i] > 0.0).collect();
        if indices.len() < self.min_samples_split {
            return Err(CollisionError::Validation(format!(
                "need at least {} samples, got {}",
                self.min_samples_split,
                indices.len()
            )));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let builder = Builder {
            tree: self,
            x,
            y,
            w: sample_weight,
        };
        let root = builder.build(&indices, 0, &mut rng);

        self.root = Some(root);
        Ok(self)
    }

    /// Fatal-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(CollisionError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(CollisionError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| leaf_proba(root, row)).collect())
    }

    /// Class labels; a leaf at exactly 0.5 predicts non-fatal
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}

fn leaf_proba(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { proba, .. } => *proba,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if sample[*feature_idx] <= *threshold {
                leaf_proba(left, sample)
            } else {
                leaf_proba(right, sample)
            }
        }
    }
}

/// Borrowed training state for one recursive build
struct Builder<'a> {
    tree: &'a DecisionTree,
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    w: &'a Array1<f64>,
}

impl Builder<'_> {
    fn class_weights(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(w0, w1), &i| {
            if self.y[i] == 1.0 {
                (w0, w1 + self.w[i])
            } else {
                (w0 + self.w[i], w1)
            }
        })
    }

    fn build(&self, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n_samples = indices.len();
        let (w0, w1) = self.class_weights(indices);
        let leaf = TreeNode::Leaf {
            proba: if w0 + w1 > 0.0 { w1 / (w0 + w1) } else { 0.0 },
            n_samples,
        };

        let should_stop = n_samples < self.tree.min_samples_split
            || n_samples < 2 * self.tree.min_samples_leaf
            || self.tree.max_depth.map_or(false, |d| depth >= d)
            || w0 == 0.0
            || w1 == 0.0;
        if should_stop {
            return leaf;
        }

        let parent_impurity = gini(w0, w1);
        let features = self.draw_features(rng);
        let best = match self.find_best_split(indices, &features, parent_impurity, w0 + w1) {
            Some(best) => best,
            None => return leaf,
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, best.feature_idx]] <= best.threshold);

        let left = Box::new(self.build(&left_indices, depth + 1, rng));
        let right = Box::new(self.build(&right_indices, depth + 1, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Candidate features for one node, in ascending order
    fn draw_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.tree.max_features {
            Some(m) if m < n_features => {
                let mut drawn = index::sample(rng, n_features, m).into_vec();
                drawn.sort_unstable();
                drawn
            }
            _ => (0..n_features).collect(),
        }
    }

    /// Best split over `features`; equal gains keep the lowest feature index
    fn find_best_split(
        &self,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
        total_weight: f64,
    ) -> Option<SplitCandidate> {
        features
            .par_iter()
            .filter_map(|&feature_idx| {
                self.best_split_for_feature(indices, feature_idx, parent_impurity, total_weight)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .fold(None, |best: Option<SplitCandidate>, c| match best {
                Some(b) if c.gain > b.gain => Some(c),
                Some(b) => Some(b),
                None => Some(c),
            })
    }

    fn best_split_for_feature(
        &self,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
        total_weight: f64,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.x[[i, feature_idx]], i))
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let (total0, total1) = self.class_weights(indices);
        let min_leaf = self.tree.min_samples_leaf;
        let n = sorted.len();

        let mut left0 = 0.0;
        let mut left1 = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for k in 0..n - 1 {
            let (value, i) = sorted[k];
            if self.y[i] == 1.0 {
                left1 += self.w[i];
            } else {
                left0 += self.w[i];
            }

            let next = sorted[k + 1].0;
            if next <= value {
                continue;
            }
            let n_left = k + 1;
            if n_left < min_leaf || n - n_left < min_leaf {
                continue;
            }

            let (right0, right1) = (total0 - left0, total1 - left1);
            let weighted = ((left0 + left1) * gini(left0, left1)
                + (right0 + right1) * gini(right0, right1))
                / total_weight;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: (value + next) / 2.0,
                    gain,
                });
            }
        }

        best
    }
}
