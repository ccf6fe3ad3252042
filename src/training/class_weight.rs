//! Class-imbalance weighting

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// How samples of each class are weighted during fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    #[default]
    None,
    /// `n / (2 * n_c)` for class `c`
    Balanced,
}

/// Balanced weights for the non-fatal and fatal classes, `(w0, w1)`.
/// An absent class gets weight 0.
pub fn balanced_class_weights(y: &Array1<f64>) -> (f64, f64) {
    let n = y.len() as f64;
    let n1 = y.iter().filter(|&&v| v == 1.0).count() as f64;
    let n0 = n - n1;
    let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 0.0 };
    (weight(n0), weight(n1))
}

/// Per-sample balanced weights
pub fn balanced_sample_weights(y: &Array1<f64>) -> Array1<f64> {
    let (w0, w1) = balanced_class_weights(y);
    y.mapv(|v| if v == 1.0 { w1 } else { w0 })
}
