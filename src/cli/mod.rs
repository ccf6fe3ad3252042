//! Collision fatality CLI
//!
//! Command-line interface for training, batch prediction, serving and
//! district insights.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::ensemble::TieBreak;
use crate::export::save_artifacts;
use crate::inference::{CollisionRecord, InferenceConfig, InferenceEngine, PredictionOutput};
use crate::insights::collisions_by_region;
use crate::server::{run_server, ServerConfig};
use crate::synthetic::SamplingMethod;
use crate::training::{TrainEngine, TrainingConfig};
use crate::utils::load_csv;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "collision-fatality")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Traffic collision fatality prediction")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the pipeline and ensemble on a labelled collision CSV
    Train {
        /// Collision CSV with an ACCLASS column
        #[arg(short, long)]
        data: PathBuf,

        /// Directory receiving pipeline.json, model.json and manifest.json
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// Classification report output
        #[arg(short, long, default_value = "classification_report.txt")]
        report: PathBuf,

        /// Z-score every feature column
        #[arg(long)]
        scale: bool,

        /// Rebalancing applied to the training split
        #[arg(long, value_enum, default_value_t = SamplingMethod::SmoteTomek)]
        sampling: SamplingMethod,

        /// Add a class-balanced RBF SVM to the ensemble. Training fails when
        /// the resampled training split exceeds 10 000 rows, which a full
        /// KSI export does
        #[arg(long)]
        with_svm: bool,

        /// Rule for a tied vote
        #[arg(long, value_enum, default_value_t = TieBreak::NonFatal)]
        tie_break: TieBreak,

        /// Random seed for the split, resampler and ensemble
        #[arg(long, default_value = "48")]
        seed: u64,
    },

    /// Predict records from a JSON file (object or array) or a CSV
    Predict {
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the HTTP prediction service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Collision CSV backing the insights endpoint
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Collision counts per district
    Regions {
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    data: &Path,
    artifacts: &Path,
    report_path: &Path,
    scale: bool,
    sampling: SamplingMethod,
    with_svm: bool,
    tie_break: TieBreak,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    let config = TrainingConfig::new()
        .with_seed(seed)
        .with_sampling(sampling)
        .with_scaling(scale)
        .with_svm(with_svm)
        .with_tie_break(tie_break);

    step_run("Loading data");
    let start = Instant::now();
    let df = load_csv(data)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run("Training ensemble");
    let start = Instant::now();
    let outcome = TrainEngine::new(config).run(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    outcome.report.write_to(report_path)?;
    step_ok(&format!("Report written to {}", report_path.display()));

    let manifest = save_artifacts(
        artifacts,
        &outcome.pipeline,
        &outcome.ensemble,
        Some(&outcome.report),
    )?;
    step_ok(&format!("Artifacts saved to {}", artifacts.display()));

    let summary = &outcome.summary;
    println!();
    kv("Features", &summary.n_features.to_string());
    kv(
        "Train (non-fatal/fatal)",
        &format!("{}/{}", summary.train_counts.0, summary.train_counts.1),
    );
    kv(
        "Resampled",
        &format!(
            "{}/{} ({:.1}% fatal)",
            summary.resampled_counts.0,
            summary.resampled_counts.1,
            summary.resampled_minority_share * 100.0
        ),
    );
    kv("Accuracy", &format!("{:.4}", outcome.report.accuracy));
    kv("Fatal recall", &format!("{:.4}", outcome.report.fatal.recall));
    if let Some(auc) = outcome.report.roc_auc {
        kv("ROC-AUC", &format!("{:.4}", auc));
    }
    kv("Fingerprint", &manifest.fingerprint[..16.min(manifest.fingerprint.len())]);
    println!();

    Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<CollisionRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let records = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(records)
}

pub fn cmd_predict(artifacts: &Path, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let engine = InferenceEngine::load(artifacts, InferenceConfig::default());
    if !engine.is_ready() {
        anyhow::bail!(
            "no usable artifacts in {}; run `collision-fatality train` first",
            artifacts.display()
        );
    }

    let is_csv = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let result: PredictionOutput = if is_csv {
        engine.predict_frame(&load_csv(input)?)?
    } else {
        engine.predict_records(&read_records(input)?)?
    };

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            let fatal = result.prediction.iter().filter(|&&p| p == 1).count();
            step_ok(&format!(
                "{} predictions ({} fatal) written to {}",
                result.prediction.len(),
                fatal,
                path.display()
            ));
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    artifacts: Option<PathBuf>,
    data: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = artifacts {
        config.artifacts_dir = dir;
    }
    if data.is_some() {
        config.data_file = data;
    }

    section("Serve");
    kv("Address", &format!("http://{}:{}/api", config.host, config.port));
    kv("Artifacts", &config.artifacts_dir.display().to_string());
    println!();

    run_server(config).await
}

pub fn cmd_regions(data: &Path) -> anyhow::Result<()> {
    section("Collisions by district");
    let df = load_csv(data)?;
    for region in collisions_by_region(&df)? {
        println!(
            "  {:<28} {}",
            region.district.white(),
            region.collision_count.to_string().bold()
        );
    }
    println!();
    Ok(())
}
