use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use collision_fatality::inference::{InferenceConfig, InferenceEngine};
use collision_fatality::preprocessing::PreprocessingPipeline;
use collision_fatality::training::{TrainEngine, TrainingConfig};

#[path = "../tests/common/mod.rs"]
mod common;

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for n_rows in [1000, 5000, 20000].iter() {
        let df = common::collision_frame(*n_rows, n_rows / 10, 7);
        let pipeline = PreprocessingPipeline::default().fit(&df).unwrap();

        group.bench_with_input(BenchmarkId::new("pipeline", n_rows), &df, |b, df| {
            b.iter(|| pipeline.transform(black_box(df)).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");
    group.sample_size(20);

    // Train once
    let outcome = TrainEngine::new(TrainingConfig::default().with_n_estimators(50))
        .run(&common::collision_frame(2000, 200, 7))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    collision_fatality::export::save_artifacts(
        dir.path(),
        &outcome.pipeline,
        &outcome.ensemble,
        Some(&outcome.report),
    )
    .unwrap();
    let engine = InferenceEngine::load(dir.path(), InferenceConfig::default());

    for batch in [1, 32, 256].iter() {
        let records: Vec<_> = (0..*batch).map(|i| common::record(i % 5 == 0)).collect();

        group.bench_with_input(BenchmarkId::new("records", batch), &records, |b, records| {
            b.iter(|| engine.predict_records(black_box(records)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_transform, bench_prediction);
criterion_main!(benches);
