//! Categorical encoding with frozen, sorted encoding tables

use crate::error::{CollisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code written for a category never seen during fit
pub const UNKNOWN_CATEGORY_CODE: f64 = -1.0;

/// Per-column mapping from category to integer code, built from sorted distinct values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingTable {
    categories: BTreeMap<String, usize>,
}

impl EncodingTable {
    /// Build a table from observed values; codes follow lexical order
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut categories: BTreeMap<String, usize> =
            values.into_iter().map(|v| (v.to_string(), 0)).collect();
        for (idx, code) in categories.values_mut().enumerate() {
            *code = idx;
        }
        Self { categories }
    }

    pub fn code(&self, value: &str) -> Option<usize> {
        self.categories.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

/// Label encoder holding one [`EncodingTable`] per categorical column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryEncoder {
    tables: BTreeMap<String, EncodingTable>,
    is_fitted: bool,
}

impl CategoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the table for one column. Missing values must already be filled.
    pub fn fit_column(&mut self, column: &str, values: &[String]) -> Result<&mut Self> {
        if values.is_empty() {
            return Err(CollisionError::DataQuality(format!(
                "cannot build an encoding table for empty column '{}'",
                column
            )));
        }
        let table = EncodingTable::from_values(values.iter().map(String::as_str));
        self.tables.insert(column.to_string(), table);
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode one column; unseen values map to [`UNKNOWN_CATEGORY_CODE`].
    /// Returns the codes and the row indices that fell back.
    pub fn transform_column(&self, column: &str, values: &[String]) -> Result<(Vec<f64>, Vec<usize>)> {
        if !self.is_fitted {
            return Err(CollisionError::ModelNotFitted);
        }
        let table = self.tables.get(column).ok_or_else(|| {
            CollisionError::Schema(format!("no encoding table fitted for column '{}'", column))
        })?;

        let mut unseen = Vec::new();
        let codes = values
            .iter()
            .enumerate()
            .map(|(row, v)| match table.code(v) {
                Some(code) => code as f64,
                None => {
                    unseen.push(row);
                    UNKNOWN_CATEGORY_CODE
                }
            })
            .collect();

        Ok((codes, unseen))
    }

    pub fn table(&self, column: &str) -> Option<&EncodingTable> {
        self.tables.get(column)
    }

    pub fn tables(&self) -> &BTreeMap<String, EncodingTable> {
        &self.tables
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Unseen-category fallbacks observed during one transform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnseenCategoryReport {
    /// Fallback count per column
    pub by_column: BTreeMap<String, usize>,
    /// Fallback count per input row
    pub by_row: Vec<usize>,
}

impl UnseenCategoryReport {
    pub fn new(n_rows: usize) -> Self {
        Self {
            by_column: BTreeMap::new(),
            by_row: vec![0; n_rows],
        }
    }

    pub fn record(&mut self, column: &str, rows: &[usize]) {
        if rows.is_empty() {
            return;
        }
        *self.by_column.entry(column.to_string()).or_insert(0) += rows.len();
        for &row in rows {
            if let Some(count) = self.by_row.get_mut(row) {
                *count += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.by_column.values().sum()
    }

    pub fn max_per_row(&self) -> usize {
        self.by_row.iter().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
