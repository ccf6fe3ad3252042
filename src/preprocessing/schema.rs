//! Raw collision-record schema
//!
//! Fixed column lists shared by the feature engineer, the cleaner and the
//! inference record type. The lists are part of the model contract: changing
//! any of them changes the feature layout and invalidates saved artifacts.

use crate::error::{CollisionError, Result};
use polars::prelude::*;

/// Identifier, free-text and outcome-leaking columns removed before encoding
pub const COLUMNS_TO_DROP: &[&str] = &[
    "INDEX", "OBJECTID", "FATAL_NO",
    "HOOD_140", "NEIGHBOURHOOD_140", "DIVISION",
    "HOOD_158", "ACCNUM",
    "STREET1", "STREET2",
    "OFFSET",
    "INJURY", "INITDIR",
    "VEHTYPE", "MANOEUVER", "DRIVACT",
    "DRIVCOND", "PEDTYPE", "PEDACT",
    "CYCLISTYPE", "CYCACT", "x", "y",
    "DATE", "TIME",
];

/// YES/NO flags mapped to 1/0
pub const BINARY_COLUMNS: &[&str] = &[
    "PEDESTRIAN",
    "CYCLIST",
    "AUTOMOBILE",
    "MOTORCYCLE",
    "TRUCK",
    "TRSN_CITY_VEH",
    "EMERG_VEH",
    "PASSENGER",
    "SPEEDING",
    "AG_DRIV",
    "REDLIGHT",
    "ALCOHOL",
    "DISABILITY",
];

/// Columns encoded through a fitted encoding table
pub const CATEGORICAL_COLUMNS: &[&str] = &[
    "ROAD_CLASS",
    "DISTRICT",
    "ACCLOC",
    "TRAFFCTL",
    "VISIBILITY",
    "LIGHT",
    "RDSFCOND",
    "IMPACTYPE",
    "INVTYPE",
    "INVAGE",
    "PEDCOND",
    "CYCCOND",
    "NEIGHBOURHOOD_158",
];

/// Categorical columns whose missing values become [`MISSING_SENTINEL`]
pub const NA_FILL_COLUMNS: &[&str] = &["PEDCOND", "CYCCOND"];

/// Category written into [`NA_FILL_COLUMNS`] when the value is missing
pub const MISSING_SENTINEL: &str = "NA";

/// Numeric columns passed through unchanged
pub const NUMERIC_COLUMNS: &[&str] = &["LATITUDE", "LONGITUDE"];

/// Raw date column decomposed by the feature engineer
pub const DATE_COLUMN: &str = "DATE";

/// Raw HHMM time column decomposed by the feature engineer
pub const TIME_COLUMN: &str = "TIME";

/// Columns derived from [`DATE_COLUMN`] and [`TIME_COLUMN`]
pub const DERIVED_COLUMNS: &[&str] = &["YEAR", "MONTH", "DAY", "DAY_OF_WEEK", "HOUR", "MINUTE"];

/// Label column, training data only
pub const TARGET: &str = "ACCLASS";

/// Label value mapped to 1
pub const TARGET_FATAL: &str = "FATAL";

/// Label value mapped to 0
pub const TARGET_NON_FATAL: &str = "NON-FATAL INJURY";

/// Seed shared by splitting, resampling and the forest
pub const RANDOM_STATE: u64 = 48;

/// Feature columns in the order the classifier sees them
pub fn feature_columns() -> Vec<String> {
    NUMERIC_COLUMNS
        .iter()
        .chain(BINARY_COLUMNS)
        .chain(CATEGORICAL_COLUMNS)
        .chain(DERIVED_COLUMNS)
        .map(|c| c.to_string())
        .collect()
}

/// Columns a raw frame must carry before feature engineering
pub fn required_raw_columns() -> Vec<&'static str> {
    let mut cols = vec![DATE_COLUMN, TIME_COLUMN];
    cols.extend_from_slice(NUMERIC_COLUMNS);
    cols.extend_from_slice(BINARY_COLUMNS);
    cols.extend_from_slice(CATEGORICAL_COLUMNS);
    cols
}

/// Whether a column name belongs to the known raw schema
pub fn is_known_column(name: &str) -> bool {
    name == TARGET
        || COLUMNS_TO_DROP.contains(&name)
        || NUMERIC_COLUMNS.contains(&name)
        || BINARY_COLUMNS.contains(&name)
        || CATEGORICAL_COLUMNS.contains(&name)
        || DERIVED_COLUMNS.contains(&name)
}

/// Fail with [`CollisionError::Schema`] if `column` is absent from `df`
pub fn require_column(df: &DataFrame, column: &str) -> Result<()> {
    if df.get_column_index(column).is_none() {
        return Err(CollisionError::Schema(format!(
            "expected column '{}' is missing",
            column
        )));
    }
    Ok(())
}

/// Detect schema drift: missing required columns or unknown extra columns
pub fn validate_raw_schema(df: &DataFrame, require_target: bool) -> Result<()> {
    for column in required_raw_columns() {
        require_column(df, column)?;
    }
    if require_target {
        require_column(df, TARGET)?;
    }

    let unknown: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| !is_known_column(name))
        .collect();

    if !unknown.is_empty() {
        return Err(CollisionError::Schema(format!(
            "unexpected column(s) not in the collision schema: {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}
