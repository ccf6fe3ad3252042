//! Integration test: train → evaluate → persist → reload → predict

mod common;

use collision_fatality::error::CollisionError;
use collision_fatality::export::{load_artifacts, save_artifacts, MANIFEST_FILE, MODEL_FILE};
use collision_fatality::inference::{InferenceConfig, InferenceEngine};
use collision_fatality::training::{TrainEngine, TrainingConfig, TrainingOutcome};
use std::sync::OnceLock;

fn outcome() -> &'static TrainingOutcome {
    static OUTCOME: OnceLock<TrainingOutcome> = OnceLock::new();
    OUTCOME.get_or_init(|| {
        TrainEngine::new(TrainingConfig::default())
            .run(&common::standard_frame())
            .unwrap()
    })
}

fn saved_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let out = outcome();
    save_artifacts(dir.path(), &out.pipeline, &out.ensemble, Some(&out.report)).unwrap();
    dir
}

#[test]
fn test_training_meets_baseline() {
    let out = outcome();
    assert!(out.report.accuracy > 0.9, "accuracy {}", out.report.accuracy);
    assert!(out.summary.resampled_minority_share >= 0.3);
    assert_eq!(out.summary.test_counts, (90, 10));
    assert_eq!(out.report.n_samples, 100);
    assert!(out.report.roc_auc.is_some());
}

#[test]
fn test_report_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classification_report.txt");
    outcome().report.write_to(&path).unwrap();

    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("Confusion matrix"));
    assert!(text.contains("Fatal"));
}

#[test]
fn test_crafted_records_predicted_differently() {
    let dir = saved_dir();
    let engine = InferenceEngine::load(dir.path(), InferenceConfig::default());
    assert!(engine.is_ready());

    let out = engine
        .predict_records(&[common::record(true), common::record(false)])
        .unwrap();
    assert_eq!(out.prediction, vec![1, 0]);

    let proba = out.prediction_proba_fatal.unwrap();
    assert!(proba[0] > proba[1]);
}

#[test]
fn test_reloaded_artifacts_predict_identically() {
    let dir = saved_dir();
    let loaded = load_artifacts(dir.path()).unwrap();
    let df = common::collision_frame(60, 10, 99);

    let original = outcome();
    let x_before = original.pipeline.transform(&df).unwrap();
    let x_after = loaded.pipeline.transform(&df).unwrap();
    assert_eq!(x_before, x_after);

    assert_eq!(
        original.ensemble.predict(&x_before).unwrap(),
        loaded.ensemble().predict(&x_after).unwrap()
    );
    assert_eq!(
        loaded.manifest.metrics.as_ref().map(|m| m.accuracy),
        Some(original.report.accuracy)
    );
}

#[test]
fn test_scaled_artifacts_reload_and_serve() {
    let scaled = TrainEngine::new(
        TrainingConfig::default()
            .with_scaling(true)
            .with_n_estimators(20),
    )
    .run(&common::standard_frame())
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    save_artifacts(dir.path(), &scaled.pipeline, &scaled.ensemble, Some(&scaled.report)).unwrap();

    let loaded = load_artifacts(dir.path()).unwrap();
    let df = common::collision_frame(60, 10, 7);
    let x_before = scaled.pipeline.transform(&df).unwrap();
    let x_after = loaded.pipeline.transform(&df).unwrap();
    assert_eq!(x_before, x_after);
    assert_eq!(
        scaled.ensemble.predict_proba(&x_before).unwrap(),
        loaded.ensemble().predict_proba(&x_after).unwrap()
    );

    let engine = InferenceEngine::load(dir.path(), InferenceConfig::default());
    assert!(engine.is_ready());
    let out = engine
        .predict_records(&[common::record(true), common::record(false)])
        .unwrap();
    assert_eq!(out.prediction.len(), 2);
}

#[test]
fn test_model_json_is_stable_across_reloads() {
    let dir = saved_dir();
    let first = std::fs::read_to_string(dir.path().join(MODEL_FILE)).unwrap();

    let loaded = load_artifacts(dir.path()).unwrap();
    let again = tempfile::tempdir().unwrap();
    save_artifacts(again.path(), &loaded.pipeline, loaded.ensemble(), None).unwrap();
    let second = std::fs::read_to_string(again.path().join(MODEL_FILE)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_tampered_manifest_is_rejected() {
    let dir = saved_dir();
    let path = dir.path().join(MANIFEST_FILE);
    let mut manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    manifest["fingerprint"] = serde_json::json!("0".repeat(64));
    std::fs::write(&path, manifest.to_string()).unwrap();

    assert!(matches!(
        load_artifacts(dir.path()),
        Err(CollisionError::ArtifactMismatch(_))
    ));
}

#[test]
fn test_model_from_other_pipeline_is_rejected() {
    let dir = saved_dir();

    let other = TrainEngine::new(
        TrainingConfig::default()
            .with_scaling(true)
            .with_n_estimators(10),
    )
    .run(&common::standard_frame())
    .unwrap();
    let other_dir = tempfile::tempdir().unwrap();
    save_artifacts(other_dir.path(), &other.pipeline, &other.ensemble, None).unwrap();

    std::fs::copy(other_dir.path().join(MODEL_FILE), dir.path().join(MODEL_FILE)).unwrap();
    assert!(matches!(
        load_artifacts(dir.path()),
        Err(CollisionError::ArtifactMismatch(_))
    ));
}

#[test]
fn test_missing_model_file_is_rejected() {
    let dir = saved_dir();
    std::fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();

    assert!(matches!(
        load_artifacts(dir.path()),
        Err(CollisionError::ArtifactMismatch(_))
    ));
    let engine = InferenceEngine::load(dir.path(), InferenceConfig::default());
    assert!(matches!(
        engine.predict_records(&[common::record(true)]),
        Err(CollisionError::ServiceNotReady)
    ));
}

#[test]
fn test_unseen_category_limit() {
    let dir = saved_dir();
    let engine = InferenceEngine::load(
        dir.path(),
        InferenceConfig::new().with_max_unseen_categories(Some(1)),
    );

    let mut value = common::record_json(false);
    value["DISTRICT"] = serde_json::json!("Atlantis");
    let one_unseen: collision_fatality::inference::CollisionRecord =
        serde_json::from_value(value.clone()).unwrap();
    assert!(engine.predict_records(&[one_unseen]).is_ok());

    value["ROAD_CLASS"] = serde_json::json!("Runway");
    let two_unseen: collision_fatality::inference::CollisionRecord =
        serde_json::from_value(value).unwrap();
    assert!(matches!(
        engine.predict_records(&[two_unseen]),
        Err(CollisionError::DataQuality(_))
    ));

    let stats = engine.stats();
    assert_eq!(stats.unseen_category_fallbacks, 3);
    assert_eq!(stats.unseen_category_rejections, 1);
    assert_eq!(stats.failures, 1);
}
