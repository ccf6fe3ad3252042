//! Strictly typed inference input

use crate::error::{CollisionError, Result};
use crate::preprocessing::schema::{
    BINARY_COLUMNS, CATEGORICAL_COLUMNS, DATE_COLUMN, NUMERIC_COLUMNS, TIME_COLUMN,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A JSON value sent either as a number or as text, e.g. `1430` or `"1430"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn as_text(&self) -> String {
        match self {
            NumberOrText::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s.trim().to_string(),
        }
    }

    fn as_f64(&self, field: &str) -> Result<f64> {
        match self {
            NumberOrText::Number(n) => Ok(*n),
            NumberOrText::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                CollisionError::DataQuality(format!(
                    "field '{}' must be numeric, got {:?}",
                    field, s
                ))
            }),
        }
    }
}

/// One collision as submitted for prediction.
///
/// Unknown fields are rejected. `PEDCOND` and `CYCCOND` may be null or absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CollisionRecord {
    pub date: String,
    pub time: NumberOrText,
    pub latitude: NumberOrText,
    pub longitude: NumberOrText,

    pub pedestrian: String,
    pub cyclist: String,
    pub automobile: String,
    pub motorcycle: String,
    pub truck: String,
    pub trsn_city_veh: String,
    pub emerg_veh: String,
    pub passenger: String,
    pub speeding: String,
    pub ag_driv: String,
    pub redlight: String,
    pub alcohol: String,
    pub disability: String,

    pub road_class: String,
    pub district: String,
    pub accloc: String,
    pub traffctl: String,
    pub visibility: String,
    pub light: String,
    pub rdsfcond: String,
    pub impactype: String,
    pub invtype: String,
    pub invage: String,
    #[serde(default)]
    pub pedcond: Option<String>,
    #[serde(default)]
    pub cyccond: Option<String>,
    pub neighbourhood_158: String,
}

impl CollisionRecord {
    /// Text value of a binary or categorical column
    fn text(&self, column: &str) -> Option<&str> {
        let value = match column {
            "PEDESTRIAN" => &self.pedestrian,
            "CYCLIST" => &self.cyclist,
            "AUTOMOBILE" => &self.automobile,
            "MOTORCYCLE" => &self.motorcycle,
            "TRUCK" => &self.truck,
            "TRSN_CITY_VEH" => &self.trsn_city_veh,
            "EMERG_VEH" => &self.emerg_veh,
            "PASSENGER" => &self.passenger,
            "SPEEDING" => &self.speeding,
            "AG_DRIV" => &self.ag_driv,
            "REDLIGHT" => &self.redlight,
            "ALCOHOL" => &self.alcohol,
            "DISABILITY" => &self.disability,
            "ROAD_CLASS" => &self.road_class,
            "DISTRICT" => &self.district,
            "ACCLOC" => &self.accloc,
            "TRAFFCTL" => &self.traffctl,
            "VISIBILITY" => &self.visibility,
            "LIGHT" => &self.light,
            "RDSFCOND" => &self.rdsfcond,
            "IMPACTYPE" => &self.impactype,
            "INVTYPE" => &self.invtype,
            "INVAGE" => &self.invage,
            "PEDCOND" => return self.pedcond.as_deref(),
            "CYCCOND" => return self.cyccond.as_deref(),
            "NEIGHBOURHOOD_158" => &self.neighbourhood_158,
            _ => return None,
        };
        Some(value.as_str())
    }

    fn coordinate(&self, column: &str) -> Result<f64> {
        match column {
            "LATITUDE" => self.latitude.as_f64(column),
            "LONGITUDE" => self.longitude.as_f64(column),
            other => Err(CollisionError::Schema(format!("unknown numeric column '{}'", other))),
        }
    }
}

/// Build a raw frame, one row per record, in the same shape as the training CSV
pub fn records_to_frame(records: &[CollisionRecord]) -> Result<DataFrame> {
    if records.is_empty() {
        return Err(CollisionError::Validation("no records to predict".to_string()));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(
        2 + NUMERIC_COLUMNS.len() + BINARY_COLUMNS.len() + CATEGORICAL_COLUMNS.len(),
    );

    let dates: Vec<String> = records.iter().map(|r| r.date.trim().to_string()).collect();
    let times: Vec<String> = records.iter().map(|r| r.time.as_text()).collect();
    columns.push(Series::new(DATE_COLUMN.into(), dates).into());
    columns.push(Series::new(TIME_COLUMN.into(), times).into());

    for &name in NUMERIC_COLUMNS {
        let values = records
            .iter()
            .map(|r| r.coordinate(name))
            .collect::<Result<Vec<f64>>>()?;
        columns.push(Series::new(name.into(), values).into());
    }

    for &name in BINARY_COLUMNS.iter().chain(CATEGORICAL_COLUMNS) {
        let values: Vec<Option<String>> = records
            .iter()
            .map(|r| r.text(name).map(str::to_string))
            .collect();
        columns.push(Series::new(name.into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "DATE": "2023-10-26", "TIME": "1430",
            "LATITUDE": 43.7, "LONGITUDE": "-79.4",
            "PEDESTRIAN": "YES", "CYCLIST": "NO", "AUTOMOBILE": "YES",
            "MOTORCYCLE": "NO", "TRUCK": "NO", "TRSN_CITY_VEH": "NO",
            "EMERG_VEH": "NO", "PASSENGER": "NO", "SPEEDING": "NO",
            "AG_DRIV": "NO", "REDLIGHT": "NO", "ALCOHOL": "NO", "DISABILITY": "NO",
            "ROAD_CLASS": "Major Arterial", "DISTRICT": "Toronto and East York",
            "ACCLOC": "At Intersection", "TRAFFCTL": "No Control",
            "VISIBILITY": "Clear", "LIGHT": "Daylight", "RDSFCOND": "Dry",
            "IMPACTYPE": "Pedestrian Collisions", "INVTYPE": "Pedestrian",
            "INVAGE": "65 to 69", "PEDCOND": null,
            "NEIGHBOURHOOD_158": "Moss Park (73)"
        })
    }

    #[test]
    fn test_deserialize_optional_conditions() {
        let record: CollisionRecord = serde_json::from_value(sample()).unwrap();
        assert_eq!(record.pedcond, None);
        assert_eq!(record.cyccond, None);
        assert_eq!(record.time, NumberOrText::Text("1430".to_string()));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut value = sample();
        value["COLOUR"] = json!("red");
        assert!(serde_json::from_value::<CollisionRecord>(value).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("DISTRICT");
        assert!(serde_json::from_value::<CollisionRecord>(value).is_err());
    }

    #[test]
    fn test_records_to_frame_shape() {
        let mut value = sample();
        value["TIME"] = json!(236);
        let record: CollisionRecord = serde_json::from_value(value).unwrap();
        let df = records_to_frame(&[record.clone(), record]).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 30);
        let time = df.column("TIME").unwrap().str().unwrap().get(0).map(str::to_string);
        assert_eq!(time.as_deref(), Some("236"));
        let lon = df.column("LONGITUDE").unwrap().f64().unwrap().get(0);
        assert_eq!(lon, Some(-79.4));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let mut value = sample();
        value["LATITUDE"] = json!("north");
        let record: CollisionRecord = serde_json::from_value(value).unwrap();
        assert!(matches!(
            records_to_frame(&[record]),
            Err(CollisionError::DataQuality(_))
        ));
    }

    #[test]
    fn test_empty_batch() {
        assert!(records_to_frame(&[]).is_err());
    }
}
