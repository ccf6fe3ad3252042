//! Tomek-link under-sampling

use crate::error::{CollisionError, Result};
use crate::synthetic::{class_counts, sq_distance, DistIdx, ResampleResult, Sampler};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Removes majority-class members of cross-class mutual nearest-neighbour pairs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomekLinks {
    majority_class: Option<i64>,
}

impl TomekLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of each row's nearest other row; ties go to the lower index
    fn nearest_neighbors(x: &Array2<f64>) -> Vec<usize> {
        let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|r| r.to_vec()).collect();

        (0..rows.len())
            .into_par_iter()
            .map(|i| {
                rows.iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(j, r)| DistIdx(sq_distance(&rows[i], r), j))
                    .min()
                    .map_or(i, |DistIdx(_, j)| j)
            })
            .collect()
    }

    /// Pairs `(i, j)`, `i < j`, that are each other's nearest neighbour with different labels
    pub fn links(x: &Array2<f64>, y: &Array1<f64>) -> Vec<(usize, usize)> {
        let nn = Self::nearest_neighbors(x);
        nn.iter()
            .enumerate()
            .filter(|&(i, &j)| i < j && nn[j] == i && y[i] != y[j])
            .map(|(i, &j)| (i, j))
            .collect()
    }
}

impl Sampler for TomekLinks {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let counts = class_counts(y);
        if counts.len() < 2 {
            return Err(CollisionError::Validation(
                "Tomek links need both fatal and non-fatal samples".to_string(),
            ));
        }
        // Ties go to the lower label, so a balanced set cleans the non-fatal side
        self.majority_class = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&class, _)| class);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ResampleResult> {
        let majority = self
            .majority_class
            .ok_or_else(|| CollisionError::Validation("Tomek links not fitted".to_string()))?;

        let mut remove = vec![false; y.len()];
        for (i, j) in Self::links(x, y) {
            for k in [i, j] {
                if y[k] as i64 == majority {
                    remove[k] = true;
                }
            }
        }

        let keep: Vec<usize> = (0..y.len()).filter(|&i| !remove[i]).collect();
        Ok(ResampleResult {
            x: x.select(Axis(0), &keep),
            y: Array1::from_iter(keep.iter().map(|&i| y[i])),
            n_synthetic: 0,
            n_removed: y.len() - keep.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_cross_class_pair() {
        // rows 1 and 2 are mutual nearest neighbours with different labels
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 1.1, 5.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(TomekLinks::links(&x, &y), vec![(1, 2)]);
    }

    #[test]
    fn test_removes_only_majority_member() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 1.1, 5.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 0.0]);
        let result = TomekLinks::new().fit_resample(&x, &y).unwrap();

        assert_eq!(result.n_removed, 1);
        assert_eq!(result.y.to_vec(), vec![0.0, 1.0, 0.0]);
        assert_eq!(result.x[[1, 0]], 1.1);
    }

    #[test]
    fn test_no_links_within_a_class() {
        let x = Array2::from_shape_vec((3, 1), vec![0.0, 0.1, 9.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0]);
        let result = TomekLinks::new().fit_resample(&x, &y).unwrap();
        assert_eq!(result.n_removed, 0);
    }
}
