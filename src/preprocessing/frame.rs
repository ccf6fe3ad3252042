//! Column extraction helpers over polars frames

use crate::error::{CollisionError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Column values cast to strings; nulls and blank strings become `None`
pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = materialized(df, column)?;
    let cast = series.cast(&DataType::String)?;
    let ca = cast.str()?;

    Ok(ca
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        })
        .collect())
}

/// Column values cast to Float64; nulls and non-numeric cells become `None`
pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = materialized(df, column)?;
    let cast = series.cast(&DataType::Float64)?;
    let ca = cast.f64()?;

    Ok(ca.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
}

/// Stack Float64 columns of `df`, in `columns` order, into a row-major matrix
pub fn to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = columns.len();
    let mut data = vec![0.0; n_rows * n_cols];

    for (j, name) in columns.iter().enumerate() {
        let values = float_values(df, name)?;
        for (i, v) in values.into_iter().enumerate() {
            data[i * n_cols + j] = v.ok_or_else(|| {
                CollisionError::DataQuality(format!(
                    "column '{}' has a missing value at row {}",
                    name, i
                ))
            })?;
        }
    }

    Ok(Array2::from_shape_vec((n_rows, n_cols), data)?)
}

fn materialized<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    let col = df.column(column).map_err(|_| {
        CollisionError::Schema(format!("expected column '{}' is missing", column))
    })?;
    Ok(col.as_materialized_series())
}
