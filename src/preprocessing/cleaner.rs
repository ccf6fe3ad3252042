//! Column dropping, missing-value fill, YES/NO mapping, categorical encoding
//! and target mapping.

use super::encoder::{CategoryEncoder, UnseenCategoryReport};
use super::frame::{float_values, string_values};
use super::schema::{
    feature_columns, require_column, validate_raw_schema, BINARY_COLUMNS, CATEGORICAL_COLUMNS,
    DERIVED_COLUMNS, MISSING_SENTINEL, NA_FILL_COLUMNS, NUMERIC_COLUMNS, TARGET, TARGET_FATAL,
    TARGET_NON_FATAL,
};
use crate::error::{CollisionError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Output of [`DataCleaner::transform`]
#[derive(Debug, Clone)]
pub struct CleanedFrame {
    /// Float64 feature columns in layout order
    pub frame: DataFrame,
    /// Mapped target, when the input carried `ACCLASS`
    pub target: Option<Array1<f64>>,
    pub unseen: UnseenCategoryReport,
}

/// Fitted cleaner; the only learned state is the categorical encoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCleaner {
    encoder: CategoryEncoder,
    columns: Vec<String>,
    is_fitted: bool,
}

impl DataCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build encoding tables from a labelled, feature-engineered training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        check_schema(df, true)?;

        let mut encoder = CategoryEncoder::new();
        for &column in CATEGORICAL_COLUMNS {
            let values = categorical_values(df, column)?;
            encoder.fit_column(column, &values)?;
            debug!(column, categories = encoder.table(column).map_or(0, |t| t.len()), "fitted encoding table");
        }

        self.encoder = encoder;
        self.columns = feature_columns();
        self.is_fitted = true;
        Ok(self)
    }

    /// Clean a feature-engineered frame. The target is mapped when present.
    pub fn transform(&self, df: &DataFrame) -> Result<CleanedFrame> {
        if !self.is_fitted {
            return Err(CollisionError::ModelNotFitted);
        }
        let has_target = df.get_column_index(TARGET).is_some();
        check_schema(df, has_target)?;

        let n_rows = df.height();
        let mut unseen = UnseenCategoryReport::new(n_rows);
        let mut out: Vec<Column> = Vec::with_capacity(self.columns.len());

        for &column in NUMERIC_COLUMNS {
            out.push(required_floats(df, column)?.into());
        }

        for &column in BINARY_COLUMNS {
            let mapped = map_binary(column, &string_values(df, column)?)?;
            out.push(Series::new(column.into(), mapped).into());
        }

        for &column in CATEGORICAL_COLUMNS {
            let values = categorical_values(df, column)?;
            let (codes, rows) = self.encoder.transform_column(column, &values)?;
            if !rows.is_empty() {
                warn!(column, count = rows.len(), "unseen category mapped to unknown code");
            }
            unseen.record(column, &rows);
            out.push(Series::new(column.into(), codes).into());
        }

        for &column in DERIVED_COLUMNS {
            out.push(required_floats(df, column)?.into());
        }

        let target = if has_target {
            Some(map_target(&string_values(df, TARGET)?)?)
        } else {
            None
        };

        Ok(CleanedFrame {
            frame: DataFrame::new(out)?,
            target,
            unseen,
        })
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<CleanedFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    pub fn encoder(&self) -> &CategoryEncoder {
        &self.encoder
    }

    /// Feature columns produced by `transform`, in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn check_schema(df: &DataFrame, require_target: bool) -> Result<()> {
    validate_raw_schema(df, require_target)?;
    for column in DERIVED_COLUMNS {
        require_column(df, column)?;
    }
    Ok(())
}

fn required_floats(df: &DataFrame, column: &str) -> Result<Series> {
    let values = float_values(df, column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| missing_value(column, row)))
        .collect::<Result<Vec<f64>>>()?;
    Ok(Series::new(column.into(), values))
}

/// Categorical strings with the NA-fill policy applied
fn categorical_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let fill = NA_FILL_COLUMNS.contains(&column);
    string_values(df, column)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(s) => Ok(s),
            None if fill => Ok(MISSING_SENTINEL.to_string()),
            None => Err(missing_value(column, row)),
        })
        .collect()
}

/// Map trimmed, case-insensitive YES/NO to 1/0
pub fn map_binary(column: &str, values: &[Option<String>]) -> Result<Vec<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v.as_deref() {
            Some(s) if s.trim().eq_ignore_ascii_case("YES") => Ok(1.0),
            Some(s) if s.trim().eq_ignore_ascii_case("NO") => Ok(0.0),
            Some(s) => Err(CollisionError::InvalidBinaryValue {
                column: column.to_string(),
                row,
                value: s.to_string(),
            }),
            None => Err(missing_value(column, row)),
        })
        .collect()
}

/// Map `FATAL` to 1 and `NON-FATAL INJURY` to 0
pub fn map_target(values: &[Option<String>]) -> Result<Array1<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case(TARGET_FATAL) => Ok(1.0),
            Some(s) if s.eq_ignore_ascii_case(TARGET_NON_FATAL) => Ok(0.0),
            other => Err(CollisionError::DataQuality(format!(
                "column '{}' at row {}: unexpected label {:?}",
                TARGET, row, other
            ))),
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

fn missing_value(column: &str, row: usize) -> CollisionError {
    CollisionError::DataQuality(format!(
        "column '{}' is missing a value at row {}",
        column, row
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(v: &[Option<&str>]) -> Vec<Option<String>> {
        v.iter().map(|s| s.map(|s| s.to_string())).collect()
    }

    #[test]
    fn test_map_binary() {
        let mapped = map_binary("SPEEDING", &opt(&[Some("YES"), Some(" no "), Some("Yes")])).unwrap();
        assert_eq!(mapped, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_map_binary_rejects_other_values() {
        let err = map_binary("SPEEDING", &opt(&[Some("YES"), Some("MAYBE")])).unwrap_err();
        match err {
            CollisionError::InvalidBinaryValue { column, row, value } => {
                assert_eq!(column, "SPEEDING");
                assert_eq!(row, 1);
                assert_eq!(value, "MAYBE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_map_binary_missing_is_data_quality() {
        let err = map_binary("ALCOHOL", &opt(&[None])).unwrap_err();
        assert!(matches!(err, CollisionError::DataQuality(_)));
    }

    #[test]
    fn test_map_target() {
        let y = map_target(&opt(&[Some("Fatal"), Some("NON-FATAL INJURY")])).unwrap();
        assert_eq!(y.to_vec(), vec![1.0, 0.0]);
        assert!(map_target(&opt(&[Some("Property Damage")])).is_err());
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(
            DataCleaner::new().transform(&df),
            Err(CollisionError::ModelNotFitted)
        ));
    }
}
