//! Date and time decomposition
//!
//! The engineer has no fitted state. It parses the raw `DATE` and `TIME`
//! columns and appends `YEAR`, `MONTH`, `DAY`, `DAY_OF_WEEK` (Monday = 0),
//! `HOUR` and `MINUTE`. The raw columns are left in place; the cleaner drops
//! them.

use super::frame::string_values;
use super::schema::{require_column, DATE_COLUMN, TIME_COLUMN};
use crate::error::{CollisionError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Rule-based date/time feature deriver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// No-op; the engineer learns nothing from data
    pub fn fit(&mut self, _df: &DataFrame) -> Result<&mut Self> {
        Ok(self)
    }

    /// Append the derived date/time columns, preserving row count and order
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        require_column(df, DATE_COLUMN)?;
        require_column(df, TIME_COLUMN)?;

        let dates = string_values(df, DATE_COLUMN)?;
        let times = string_values(df, TIME_COLUMN)?;

        let n = df.height();
        let mut year = Vec::with_capacity(n);
        let mut month = Vec::with_capacity(n);
        let mut day = Vec::with_capacity(n);
        let mut weekday = Vec::with_capacity(n);
        let mut hour = Vec::with_capacity(n);
        let mut minute = Vec::with_capacity(n);

        for (row, (date, time)) in dates.iter().zip(times.iter()).enumerate() {
            let date = parse_date(date.as_deref(), row)?;
            let (h, m) = parse_hhmm(time.as_deref(), row)?;

            year.push(date.year());
            month.push(date.month() as i32);
            day.push(date.day() as i32);
            weekday.push(date.weekday().num_days_from_monday() as i32);
            hour.push(h as i32);
            minute.push(m as i32);
        }

        let mut out = df.clone();
        for (name, values) in [
            ("YEAR", year),
            ("MONTH", month),
            ("DAY", day),
            ("DAY_OF_WEEK", weekday),
            ("HOUR", hour),
            ("MINUTE", minute),
        ] {
            out.with_column(Series::new(name.into(), values))?;
        }

        Ok(out)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

/// Parse a collision date in any of the accepted layouts
pub fn parse_date(raw: Option<&str>, row: usize) -> Result<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        CollisionError::DataQuality(format!("column '{}' is missing a value at row {}", DATE_COLUMN, row))
    })?;

    // Exports carry a "+00" UTC offset with no minutes, which chrono rejects.
    let stripped = raw.strip_suffix("+00").unwrap_or(raw).trim_end();

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(stripped, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, fmt) {
            return Ok(dt.date());
        }
    }

    Err(CollisionError::DataQuality(format!(
        "column '{}' at row {}: unrecognised date {:?}",
        DATE_COLUMN, row, raw
    )))
}

/// Parse an HHMM time given as integer text ("236" is 02:36)
pub fn parse_hhmm(raw: Option<&str>, row: usize) -> Result<(u32, u32)> {
    let invalid = |detail: String| {
        CollisionError::DataQuality(format!("column '{}' at row {}: {}", TIME_COLUMN, row, detail))
    };

    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing value".to_string()))?;

    let value = match raw.parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            // Float columns render as "1430.0"
            let f: f64 = raw
                .parse()
                .map_err(|_| invalid(format!("{:?} is not an HHMM time", raw)))?;
            if f < 0.0 || f.fract() != 0.0 {
                return Err(invalid(format!("{:?} is not an HHMM time", raw)));
            }
            f as u32
        }
    };

    let (hour, minute) = (value / 100, value % 100);
    if value > 2359 || minute >= 60 {
        return Err(invalid(format!("{} is outside 0000..=2359", value)));
    }

    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 3, 7).unwrap();
        for raw in [
            "2019-03-07",
            "2019/03/07",
            "2019/03/07 00:00:00+00",
            "2019-03-07T05:00:00",
            "3/7/2019",
            "3/7/2019 5:00:00 AM",
            "  2019-03-07 ",
        ] {
            assert_eq!(parse_date(Some(raw), 0).unwrap(), expected, "{}", raw);
        }
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let err = parse_date(Some("yesterday"), 4).unwrap_err();
        assert!(matches!(err, CollisionError::DataQuality(_)));
        assert!(err.to_string().contains("row 4"));
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm(Some("236"), 0).unwrap(), (2, 36));
        assert_eq!(parse_hhmm(Some("0"), 0).unwrap(), (0, 0));
        assert_eq!(parse_hhmm(Some("2359"), 0).unwrap(), (23, 59));
        assert_eq!(parse_hhmm(Some("1430.0"), 0).unwrap(), (14, 30));
        assert!(parse_hhmm(Some("2400"), 0).is_err());
        assert!(parse_hhmm(Some("1275"), 0).is_err());
        assert!(parse_hhmm(None, 0).is_err());
    }

    #[test]
    fn test_transform_appends_columns() {
        let df = df!(
            "DATE" => &["2020-06-01", "2020-06-07"],
            "TIME" => &[1430i64, 5],
        )
        .unwrap();

        let out = FeatureEngineer::new().transform(&df).unwrap();
        assert_eq!(out.height(), 2);

        let dow = out.column("DAY_OF_WEEK").unwrap().i32().unwrap();
        assert_eq!(dow.get(0), Some(0)); // Monday
        assert_eq!(dow.get(1), Some(6)); // Sunday

        let minute = out.column("MINUTE").unwrap().i32().unwrap();
        assert_eq!(minute.get(1), Some(5));
    }

    #[test]
    fn test_transform_requires_time() {
        let df = df!("DATE" => &["2020-06-01"]).unwrap();
        let err = FeatureEngineer::new().transform(&df).unwrap_err();
        assert!(matches!(err, CollisionError::Schema(_)));
    }
}
