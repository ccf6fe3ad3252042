//! Feature scaling

use crate::error::{CollisionError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// No scaling
    None,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

/// Feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: BTreeMap<String, ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the named Float64 columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                CollisionError::Schema(format!("expected column '{}' is missing", col_name))
            })?;
            let params = self.compute_params(column.as_materialized_series())?;
            self.params.insert(col_name.clone(), params);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data.
    /// Builds all replacement columns first, then applies them in a single pass.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CollisionError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|(col_name, params)| {
                let column = df.column(col_name).map_err(|_| {
                    CollisionError::Schema(format!("expected column '{}' is missing", col_name))
                })?;
                scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn params(&self) -> &BTreeMap<String, ScalerParams> {
        &self.params
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    fn compute_params(&self, series: &Series) -> Result<ScalerParams> {
        let ca = series.f64()?;

        match self.scaler_type {
            ScalerType::Standard => {
                let mean = ca.mean().unwrap_or(0.0);
                let std = ca.std(1).unwrap_or(1.0);
                Ok(ScalerParams {
                    center: mean,
                    scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                })
            }
            ScalerType::None => Ok(ScalerParams {
                center: 0.0,
                scale: 1.0,
            }),
        }
    }
}

fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
    let ca = series.f64()?;

    let scaled: Float64Chunked = ca
        .into_iter()
        .map(|opt| opt.map(|v| (v - params.center) / params.scale))
        .collect();

    Ok(scaled.with_name(series.name().clone()).into_series())
}
