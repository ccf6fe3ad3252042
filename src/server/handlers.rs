//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::inference::{CollisionRecord, PredictionOutput};
use crate::insights::{collisions_by_region, RegionCount};
use crate::utils::load_csv;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Accepts a single record object or an array of records
fn parse_records(body: Value) -> Result<Vec<CollisionRecord>> {
    let records = match body {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| ServerError::BadRequest(format!("record {}: {}", i, e)))
            })
            .collect::<Result<Vec<CollisionRecord>>>()?,
        Value::Object(_) => vec![serde_json::from_value(body)
            .map_err(|e| ServerError::BadRequest(format!("record 0: {}", e)))?],
        _ => {
            return Err(ServerError::BadRequest(
                "expected a collision record or an array of records".to_string(),
            ))
        }
    };

    if records.is_empty() {
        return Err(ServerError::BadRequest("no records to predict".to_string()));
    }
    Ok(records)
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionOutput>> {
    let Json(body) = body?;
    let records = parse_records(body)?;
    info!(records = records.len(), "Received prediction request");

    let output = tokio::task::spawn_blocking(move || state.engine.predict_records(&records))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    Ok(Json(output))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let manifest = state.engine.manifest();
    Json(json!({
        "status": "ok",
        "ready": state.engine.is_ready(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "model_fingerprint": manifest.map(|m| m.fingerprint.clone()),
        "model_created_at": manifest.map(|m| m.created_at.to_rfc3339()),
    }))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ready": state.engine.is_ready(),
        "inference": state.engine.stats(),
        "metrics": state.engine.manifest().and_then(|m| m.metrics.clone()),
    }))
}

pub async fn collisions_by_region_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RegionCount>>> {
    let path = state
        .data_file
        .clone()
        .ok_or_else(|| ServerError::NotFound("no collision data file configured".to_string()))?;
    if !path.is_file() {
        return Err(ServerError::NotFound(format!(
            "collision data file {} does not exist",
            path.display()
        )));
    }

    let regions = tokio::task::spawn_blocking(move || {
        let df = load_csv(&path)?;
        collisions_by_region(&df)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("insights task failed: {}", e)))??;

    Ok(Json(regions))
}
