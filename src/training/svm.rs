//! Binary Support Vector Classifier trained with SMO
//!
//! Per-sample box constraints `C * w_y` implement class weighting. With
//! `probability` enabled a Platt sigmoid is fit on the training decision
//! values so the classifier can report fatal probabilities.

use super::class_weight::{balanced_class_weights, ClassWeight};
use super::platt::PlattScaling;
use crate::error::{CollisionError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training returns an error instead of exhausting memory.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// SVM configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub class_weight: ClassWeight,
    /// Fit a Platt sigmoid so `predict_proba` is available
    pub probability: bool,
    /// Tolerance for the KKT check
    pub tol: f64,
    /// Maximum number of full passes
    pub max_iter: usize,
    pub random_state: u64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            class_weight: ClassWeight::Balanced,
            probability: true,
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
        }
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    support_vectors: Option<Array2<f64>>,
    /// `alpha_i * y_i` per support vector
    dual_coef: Option<Array1<f64>>,
    bias: f64,
    gamma: f64,
    platt: Option<PlattScaling>,
}

impl SVMClassifier {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coef: None,
            bias: 0.0,
            gamma: 1.0,
            platt: None,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Whether `predict_proba` can be answered
    pub fn supports_proba(&self) -> bool {
        self.config.probability
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n = x.nrows();
        if n != y.len() {
            return Err(CollisionError::Shape {
                expected: format!("{} labels", n),
                actual: format!("{} labels", y.len()),
            });
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(CollisionError::InvalidParameter {
                name: "n_samples".to_string(),
                value: n.to_string(),
                reason: format!(
                    "SVM kernel matrix is limited to {} samples",
                    MAX_KERNEL_MATRIX_SAMPLES
                ),
            });
        }
        let n_pos = y.iter().filter(|&&v| v == 1.0).count();
        if n_pos == 0 || n_pos == n {
            return Err(CollisionError::Validation(
                "SVM needs both fatal and non-fatal samples".to_string(),
            ));
        }

        // gamma = 1 / (n_features * var(X))
        let var = x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64
            - (x.sum() / x.len() as f64).powi(2);
        self.gamma = if var > 0.0 {
            1.0 / (x.ncols() as f64 * var)
        } else {
            1.0
        };

        let (w0, w1) = match self.config.class_weight {
            ClassWeight::Balanced => balanced_class_weights(y),
            ClassWeight::None => (1.0, 1.0),
        };
        let signed: Array1<f64> = y.mapv(|v| if v == 1.0 { 1.0 } else { -1.0 });
        let bounds: Array1<f64> = y.mapv(|v| self.config.c * if v == 1.0 { w1 } else { w0 });

        let kernel_matrix = self.compute_kernel_matrix(x);
        let (alphas, bias) = self.smo_train(&kernel_matrix, &signed, &bounds);

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = Some(support.iter().map(|&i| alphas[i] * signed[i]).collect());
        self.bias = bias;

        self.platt = if self.config.probability {
            let decision: Array1<f64> = (0..n)
                .map(|i| {
                    support
                        .iter()
                        .map(|&s| alphas[s] * signed[s] * kernel_matrix[[s, i]])
                        .sum::<f64>()
                        + bias
                })
                .collect();
            let mut platt = PlattScaling::new();
            platt.fit(&decision, y)?;
            Some(platt)
        } else {
            None
        };

        Ok(self)
    }

    /// SMO with per-sample upper bounds; returns `(alphas, bias)`
    fn smo_train(
        &self,
        k: &Array2<f64>,
        y: &Array1<f64>,
        c: &Array1<f64>,
    ) -> (Array1<f64>, f64) {
        let n = y.len();
        let mut alphas = Array1::<f64>::zeros(n);
        // Error cache: f(x_i) - y_i with all alphas at zero
        let mut errors: Array1<f64> = -y.clone();
        let mut bias = 0.0;
        let tol = self.config.tol;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];
                let kkt_violated = (y[i] * e_i < -tol && alphas[i] < c[i])
                    || (y[i] * e_i > tol && alphas[i] > 0.0);
                if !kkt_violated {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (l, h) = if y[i] != y[j] {
                    let diff = alpha_j_old - alpha_i_old;
                    (diff.max(0.0), (c[i] + diff).min(c[j]))
                } else {
                    let sum = alpha_i_old + alpha_j_old;
                    ((sum - c[i]).max(0.0), sum.min(c[j]))
                };
                if h - l < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);
                alphas[i] = alpha_i;
                alphas[j] = alpha_j;

                let di = y[i] * (alpha_i - alpha_i_old);
                let dj = y[j] * (alpha_j - alpha_j_old);
                let b1 = bias - e_i - di * k[[i, i]] - dj * k[[i, j]];
                let b2 = bias - e_j - di * k[[i, j]] - dj * k[[j, j]];
                let new_bias = if alpha_i > 0.0 && alpha_i < c[i] {
                    b1
                } else if alpha_j > 0.0 && alpha_j < c[j] {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };
                let db = new_bias - bias;
                bias = new_bias;

                for t in 0..n {
                    errors[t] += di * k[[i, t]] + dj * k[[j, t]] + db;
                }

                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, bias)
    }

    /// Kernel matrix, upper-triangle rows computed in parallel
    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| self.kernel(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row_vals) in rows.into_iter().enumerate() {
            for (offset, val) in row_vals.into_iter().enumerate() {
                let j = i + offset;
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    /// K(x, y) = exp(-γ ||x - y||²)
    fn kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let norm_sq: f64 = a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum();
        (-self.gamma * norm_sq).exp()
    }

    /// Signed distance to the separating surface; positive means fatal
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (sv, coef) = match (&self.support_vectors, &self.dual_coef) {
            (Some(sv), Some(coef)) => (sv, coef),
            _ => return Err(CollisionError::ModelNotFitted),
        };
        if x.ncols() != sv.ncols() {
            return Err(CollisionError::Shape {
                expected: format!("{} features", sv.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let scores: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                sv.rows()
                    .into_iter()
                    .zip(coef.iter())
                    .map(|(s, &c)| c * self.kernel(x.row(i), s))
                    .sum::<f64>()
                    + self.bias
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }

    /// Class labels from the sign of the decision function
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|d| if d > 0.0 { 1.0 } else { 0.0 }))
    }

    /// Platt-calibrated fatal probability
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let platt = match &self.platt {
            Some(p) => p,
            None if self.config.probability => return Err(CollisionError::ModelNotFitted),
            None => {
                return Err(CollisionError::ProbabilityUnsupported(
                    "SVM was built without probability calibration".to_string(),
                ))
            }
        };
        platt.calibrate(&self.decision_function(x)?)
    }
}
