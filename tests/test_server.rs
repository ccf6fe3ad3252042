//! Integration test: Server API endpoints

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use collision_fatality::export::save_artifacts;
use collision_fatality::inference::{InferenceConfig, InferenceEngine};
use collision_fatality::server::{create_router, AppState, ServerConfig};
use collision_fatality::training::{TrainEngine, TrainingConfig};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

fn config(artifacts_dir: PathBuf, data_file: Option<PathBuf>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        artifacts_dir,
        data_file,
        max_body_size: 64 * 1024,
        cors_origin: None,
        max_unseen_categories: None,
    }
}

/// Artifacts trained once and shared by every test in this file
fn trained_dir() -> &'static tempfile::TempDir {
    static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let out = TrainEngine::new(TrainingConfig::default().with_n_estimators(30))
            .run(&common::standard_frame())
            .unwrap();
        save_artifacts(dir.path(), &out.pipeline, &out.ensemble, Some(&out.report)).unwrap();
        dir
    })
}

fn ready_app() -> axum::Router {
    let config = config(trained_dir().path().to_path_buf(), None);
    create_router(Arc::new(AppState::new(&config)), &config)
}

fn empty_app(data_file: Option<PathBuf>) -> axum::Router {
    let config = config(PathBuf::from("/nonexistent/artifacts"), data_file);
    let state = AppState::with_engine(
        InferenceEngine::new(InferenceConfig::default()),
        config.data_file.clone(),
    );
    create_router(Arc::new(state), &config)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_not_ready() {
    let (status, body) = send(empty_app(None), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_predict_not_ready_is_503() {
    let body = serde_json::to_string(&vec![common::record_json(true)]).unwrap();
    let (status, body) = send(empty_app(None), post_json(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_predict_batch() {
    let records = vec![common::record_json(true), common::record_json(false)];
    let (status, body) = send(ready_app(), post_json(serde_json::to_string(&records).unwrap())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], serde_json::json!([1, 0]));
    assert_eq!(body["prediction_proba_fatal"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_predict_single_object() {
    let body = common::record_json(false).to_string();
    let (status, body) = send(ready_app(), post_json(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], serde_json::json!([0]));
}

#[tokio::test]
async fn test_unknown_field_is_400() {
    let mut record = common::record_json(true);
    record["WEATHER_SCORE"] = serde_json::json!(3);
    let (status, body) = send(ready_app(), post_json(record.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_invalid_binary_is_400() {
    let mut record = common::record_json(true);
    record["SPEEDING"] = serde_json::json!("MAYBE");
    let (status, body) = send(ready_app(), post_json(record.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("SPEEDING"));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (status, body) = send(ready_app(), post_json("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let records: Vec<Value> = (0..200).map(|_| common::record_json(true)).collect();
    let response = ready_app()
        .oneshot(post_json(serde_json::to_string(&records).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_stats_count_requests() {
    let config = config(trained_dir().path().to_path_buf(), None);
    let state = Arc::new(AppState::new(&config));
    let app = create_router(Arc::clone(&state), &config);

    let body = serde_json::to_string(&vec![common::record_json(true)]).unwrap();
    let (status, _) = send(app.clone(), post_json(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inference"]["requests"], 1);
    assert_eq!(body["inference"]["records"], 1);
    assert!(body["metrics"]["accuracy"].is_number());
}

#[tokio::test]
async fn test_collisions_by_region() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collisions.csv");
    let mut df = common::collision_frame(40, 5, 1);
    common::write_csv(&mut df, &path);

    let (status, body) = send(
        empty_app(Some(path)),
        get("/api/insights/collisions-by-region"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let regions = body.as_array().unwrap();
    let total: u64 = regions
        .iter()
        .map(|r| r["collision_count"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 40);
    let counts: Vec<u64> = regions
        .iter()
        .map(|r| r["collision_count"].as_u64().unwrap())
        .collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    assert!(regions[0]["DISTRICT"].is_string());
}

#[tokio::test]
async fn test_insights_without_data_is_404() {
    let (status, body) = send(empty_app(None), get("/api/insights/collisions-by-region")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = send(empty_app(None), get("/api/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
