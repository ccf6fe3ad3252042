//! Descriptive statistics over the raw collision export

use crate::error::Result;
use crate::preprocessing::frame::string_values;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column collisions are grouped by
pub const REGION_COLUMN: &str = "DISTRICT";

/// Number of collisions recorded in one district
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    #[serde(rename = "DISTRICT")]
    pub district: String,
    pub collision_count: usize,
}

/// Collision counts per district, most collisions first.
///
/// Rows without a district are skipped; equal counts are ordered by name.
pub fn collisions_by_region(df: &DataFrame) -> Result<Vec<RegionCount>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for district in string_values(df, REGION_COLUMN)?.into_iter().flatten() {
        *counts.entry(district).or_default() += 1;
    }

    let mut regions: Vec<RegionCount> = counts
        .into_iter()
        .map(|(district, collision_count)| RegionCount {
            district,
            collision_count,
        })
        .collect();
    regions.sort_by(|a, b| b.collision_count.cmp(&a.collision_count));
    Ok(regions)
}
