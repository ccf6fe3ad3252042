//! K-Nearest Neighbors classifier

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{CollisionError, Result};

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    pub n_neighbors: usize,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self { n_neighbors: 5 }
    }
}

/// Binary K-Nearest Neighbors classifier (label 1 = fatal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig { n_neighbors: k })
    }

    /// Fit the classifier (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(CollisionError::Shape {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }
        if self.config.n_neighbors == 0 || self.config.n_neighbors > x.nrows() {
            return Err(CollisionError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: self.config.n_neighbors.to_string(),
                reason: format!("must be in 1..={}", x.nrows()),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(self)
    }

    /// Predict class labels; a neighbourhood tie goes to the non-fatal class
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Share of fatal neighbours per row (parallelized over rows)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(CollisionError::ModelNotFitted),
        };
        if x.ncols() != x_train.ncols() {
            return Err(CollisionError::Shape {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let k = self.config.n_neighbors;
        let probs: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k);
                let fatal = neighbors.iter().filter(|n| n.label == 1.0).count();
                fatal as f64 / neighbors.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }
}

/// Max-heap entry for partial sort; equal distances favour the earlier training row
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    dist: f64,
    index: usize,
    label: f64,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Neighbor {}
impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
) -> Vec<Neighbor> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (index, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor {
            dist: euclidean(point, row),
            index,
            label: y_train[index],
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(top) = heap.peek() {
            if candidate < *top {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_vec()
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| {
            let d = ai - bi;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (20, 2),
            vec![
                // Class 0 (low values)
                1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0, 1.5, 2.5, 2.0, 1.5, 2.5, 1.0,
                1.2, 1.8, 1.8, 1.2,
                // Class 1 (high values)
                8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0, 8.5, 9.5, 9.0, 8.5, 9.5, 8.0,
                8.2, 8.8, 8.8, 8.2,
            ],
        )
        .unwrap();

        let y = Array1::from_iter((0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }));
        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();

        let mut knn = KNNClassifier::with_k(5);
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_predict_proba_is_fatal_share() {
        let (x, y) = create_classification_data();
        let mut knn = KNNClassifier::with_k(5);
        knn.fit(&x, &y).unwrap();

        let points = Array2::from_shape_vec((2, 2), vec![1.5, 1.5, 9.0, 9.0]).unwrap();
        let proba = knn.predict_proba(&points).unwrap();
        assert_eq!(proba[0], 0.0);
        assert_eq!(proba[1], 1.0);
    }

    #[test]
    fn test_even_k_tie_goes_non_fatal() {
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 2.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0]);
        let mut knn = KNNClassifier::with_k(2);
        knn.fit(&x, &y).unwrap();

        let points = Array2::from_shape_vec((1, 1), vec![1.0]).unwrap();
        assert_eq!(knn.predict(&points).unwrap()[0], 0.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let knn = KNNClassifier::with_k(3);
        let x = Array2::zeros((1, 2));
        assert!(matches!(knn.predict(&x), Err(CollisionError::ModelNotFitted)));
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut knn = KNNClassifier::with_k(5);
        let x = Array2::zeros((3, 1));
        let y = Array1::zeros(3);
        assert!(knn.fit(&x, &y).is_err());
    }
}
