//! Platt scaling (sigmoid calibration) of raw decision values

use crate::error::{CollisionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fits `P(y=1|f) = 1 / (1 + exp(A*f + B))` on decision values `f`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattScaling {
    a: Option<f64>,
    b: Option<f64>,
    max_iter: usize,
    tol: f64,
}

impl PlattScaling {
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-10,
        }
    }

    pub fn parameters(&self) -> Option<(f64, f64)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    fn sigmoid_prob(f: f64, a: f64, b: f64) -> f64 {
        let z = a * f + b;
        // Stable for both signs of z
        if z >= 0.0 {
            let e = (-z).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + z.exp())
        }
    }

    /// Newton's method on the regularised targets of Platt (1999)
    pub fn fit(&mut self, decision: &Array1<f64>, labels: &Array1<f64>) -> Result<&mut Self> {
        let n = decision.len();
        if n != labels.len() {
            return Err(CollisionError::Validation(
                "decision values and labels must have the same length".to_string(),
            ));
        }
        if n == 0 {
            return Err(CollisionError::Validation("empty calibration input".to_string()));
        }

        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();

        for _ in 0..self.max_iter {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            let mut hess_aa = 1e-12;
            let mut hess_ab = 0.0;
            let mut hess_bb = 1e-12;

            for (&f, &t) in decision.iter().zip(targets.iter()) {
                let p = Self::sigmoid_prob(f, a, b);
                // d/dz of the log loss for P = 1/(1+exp(z))
                let d1 = t - p;
                let d2 = p * (1.0 - p);

                grad_a += f * d1;
                grad_b += d1;
                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-18 {
                break;
            }

            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;
            a -= delta_a;
            b -= delta_b;

            if delta_a.abs() < self.tol && delta_b.abs() < self.tol {
                break;
            }
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(self)
    }

    /// Calibrated probability of the positive class
    pub fn calibrate(&self, decision: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self.parameters().ok_or(CollisionError::ModelNotFitted)?;
        Ok(decision.mapv(|f| Self::sigmoid_prob(f, a, b)))
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}
