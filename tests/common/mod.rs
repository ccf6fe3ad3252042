//! Synthetic collision data shared by the integration tests
//!
//! A row is fatal exactly when PEDESTRIAN = YES, SPEEDING = YES and
//! TRAFFCTL = "No Control".

#![allow(dead_code)]

use collision_fatality::inference::CollisionRecord;
use collision_fatality::preprocessing::schema::{BINARY_COLUMNS, TARGET_FATAL, TARGET_NON_FATAL};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};

pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("ROAD_CLASS", &["Major Arterial", "Minor Arterial", "Collector", "Local"]),
    ("DISTRICT", &["Toronto and East York", "Etobicoke York", "North York", "Scarborough"]),
    ("ACCLOC", &["At Intersection", "Non Intersection", "Intersection Related"]),
    ("TRAFFCTL", &["No Control", "Traffic Signal", "Stop Sign", "Pedestrian Crossover"]),
    ("VISIBILITY", &["Clear", "Rain", "Snow"]),
    ("LIGHT", &["Daylight", "Dark", "Dusk"]),
    ("RDSFCOND", &["Dry", "Wet"]),
    ("IMPACTYPE", &["Pedestrian Collisions", "Turning Movement", "Rear End"]),
    ("INVTYPE", &["Driver", "Pedestrian", "Passenger"]),
    ("INVAGE", &["20 to 24", "25 to 29", "65 to 69"]),
    ("NEIGHBOURHOOD_158", &["Moss Park (73)", "West Humber-Clairville (1)", "Malvern West (128)"]),
];

const CONDITIONS: &[&str] = &["Normal", "Inattentive", "Had Been Drinking"];

fn pick<'a>(rng: &mut ChaCha8Rng, values: &[&'a str]) -> &'a str {
    values[rng.gen_range(0..values.len())]
}

fn yes_no(rng: &mut ChaCha8Rng, p_yes: f64) -> &'static str {
    if rng.gen_bool(p_yes) {
        "YES"
    } else {
        "NO"
    }
}

/// Labelled raw frame shaped like the collision CSV export
pub fn collision_frame(n: usize, n_fatal: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut fatal: Vec<bool> = (0..n).map(|i| i < n_fatal).collect();
    fatal.shuffle(&mut rng);

    let mut binary: Vec<Vec<String>> = vec![Vec::with_capacity(n); BINARY_COLUMNS.len()];
    let mut categorical: Vec<Vec<String>> = vec![Vec::with_capacity(n); CATEGORIES.len()];
    let mut pedcond = Vec::with_capacity(n);
    let mut cyccond = Vec::with_capacity(n);
    let mut dates = Vec::with_capacity(n);
    let mut times = Vec::with_capacity(n);
    let mut lat = Vec::with_capacity(n);
    let mut lon = Vec::with_capacity(n);
    let mut acclass = Vec::with_capacity(n);
    let mut accnum = Vec::with_capacity(n);

    let pedestrian_idx = BINARY_COLUMNS.iter().position(|&c| c == "PEDESTRIAN").unwrap();
    let speeding_idx = BINARY_COLUMNS.iter().position(|&c| c == "SPEEDING").unwrap();
    let traffctl_idx = CATEGORIES.iter().position(|(c, _)| *c == "TRAFFCTL").unwrap();

    for (i, &is_fatal) in fatal.iter().enumerate() {
        let mut flags: Vec<&str> = BINARY_COLUMNS.iter().map(|_| yes_no(&mut rng, 0.3)).collect();
        let mut cats: Vec<&str> = CATEGORIES.iter().map(|(_, v)| pick(&mut rng, v)).collect();

        if is_fatal {
            flags[pedestrian_idx] = "YES";
            flags[speeding_idx] = "YES";
            cats[traffctl_idx] = "No Control";
        } else if flags[pedestrian_idx] == "YES"
            && flags[speeding_idx] == "YES"
            && cats[traffctl_idx] == "No Control"
        {
            flags[speeding_idx] = "NO";
        }

        for (col, v) in binary.iter_mut().zip(&flags) {
            col.push(v.to_string());
        }
        for (col, v) in categorical.iter_mut().zip(&cats) {
            col.push(v.to_string());
        }

        pedcond.push(if flags[pedestrian_idx] == "YES" {
            Some(pick(&mut rng, CONDITIONS).to_string())
        } else {
            None
        });
        cyccond.push(if rng.gen_bool(0.2) {
            Some(pick(&mut rng, CONDITIONS).to_string())
        } else {
            None
        });

        dates.push(format!(
            "{}/{:02}/{:02} 00:00:00+00",
            rng.gen_range(2015..=2022),
            rng.gen_range(1..=12),
            rng.gen_range(1..=28)
        ));
        times.push(rng.gen_range(0..24) * 100 + rng.gen_range(0..60));
        lat.push(43.6 + rng.gen_range(0.0..0.2));
        lon.push(-79.5 + rng.gen_range(0.0..0.3));
        acclass.push(if is_fatal { TARGET_FATAL } else { TARGET_NON_FATAL }.to_string());
        accnum.push(1000 + i as i64);
    }

    let mut columns: Vec<Column> = vec![
        Series::new("ACCNUM".into(), accnum).into(),
        Series::new("DATE".into(), dates).into(),
        Series::new("TIME".into(), times).into(),
        Series::new("LATITUDE".into(), lat).into(),
        Series::new("LONGITUDE".into(), lon).into(),
    ];
    for (name, values) in BINARY_COLUMNS.iter().zip(binary) {
        columns.push(Series::new((*name).into(), values).into());
    }
    for ((name, _), values) in CATEGORIES.iter().zip(categorical) {
        columns.push(Series::new((*name).into(), values).into());
    }
    columns.push(Series::new("PEDCOND".into(), pedcond).into());
    columns.push(Series::new("CYCCOND".into(), cyccond).into());
    columns.push(Series::new("ACCLASS".into(), acclass).into());

    DataFrame::new(columns).unwrap()
}

/// The standard 500-row set with 50 fatal collisions
pub fn standard_frame() -> DataFrame {
    collision_frame(500, 50, 7)
}

/// A JSON inference record; `fatal` selects the pattern that defines fatal rows
pub fn record_json(fatal: bool) -> Value {
    let (pedestrian, speeding, traffctl) = if fatal {
        ("YES", "YES", "No Control")
    } else {
        ("NO", "NO", "Traffic Signal")
    };
    json!({
        "DATE": "2019-06-14", "TIME": 1430,
        "LATITUDE": 43.7, "LONGITUDE": -79.4,
        "PEDESTRIAN": pedestrian, "CYCLIST": "NO", "AUTOMOBILE": "YES",
        "MOTORCYCLE": "NO", "TRUCK": "NO", "TRSN_CITY_VEH": "NO",
        "EMERG_VEH": "NO", "PASSENGER": "NO", "SPEEDING": speeding,
        "AG_DRIV": "NO", "REDLIGHT": "NO", "ALCOHOL": "NO", "DISABILITY": "NO",
        "ROAD_CLASS": "Major Arterial", "DISTRICT": "Toronto and East York",
        "ACCLOC": "At Intersection", "TRAFFCTL": traffctl,
        "VISIBILITY": "Clear", "LIGHT": "Daylight", "RDSFCOND": "Dry",
        "IMPACTYPE": "Pedestrian Collisions", "INVTYPE": "Pedestrian",
        "INVAGE": "65 to 69",
        "PEDCOND": if fatal { json!("Inattentive") } else { Value::Null },
        "NEIGHBOURHOOD_158": "Moss Park (73)"
    })
}

pub fn record(fatal: bool) -> CollisionRecord {
    serde_json::from_value(record_json(fatal)).unwrap()
}

/// Write `df` as CSV to `path`
pub fn write_csv(df: &mut DataFrame, path: &std::path::Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}
