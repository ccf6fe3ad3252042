//! Prediction HTTP service
//!
//! REST API over a loaded [`InferenceEngine`](crate::inference::InferenceEngine):
//! prediction, health, counters and district insights.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub data_file: Option<PathBuf>,
    pub max_body_size: usize,
    pub cors_origin: Option<String>,
    pub max_unseen_categories: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./artifacts")),
            data_file: std::env::var("DATA_FILE").ok().map(PathBuf::from),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
            max_unseen_categories: std::env::var("MAX_UNSEEN_CATEGORIES")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let state = Arc::new(AppState::new(&config));
    if !state.engine.is_ready() {
        warn!(
            artifacts_dir = %config.artifacts_dir.display(),
            "Model artifacts not loaded, prediction requests will return 503. Train the model first."
        );
    }
    let app = create_router(Arc::clone(&state), &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        address = %addr,
        ready = state.engine.is_ready(),
        max_body_size = config.max_body_size,
        started_at = %start_time.to_rfc3339(),
        "Collision fatality server starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
