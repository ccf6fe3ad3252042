//! Collision fatality prediction - main entry point

use clap::Parser;
use collision_fatality::cli::{cmd_predict, cmd_regions, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collision_fatality=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            artifacts,
            report,
            scale,
            sampling,
            with_svm,
            tie_break,
            seed,
        } => {
            // CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || {
                cmd_train(&data, &artifacts, &report, scale, sampling, with_svm, tie_break, seed)
            })
            .await??;
        }
        Commands::Predict {
            artifacts,
            input,
            output,
        } => {
            cmd_predict(&artifacts, &input, output.as_deref())?;
        }
        Commands::Serve {
            host,
            port,
            artifacts,
            data,
        } => {
            cmd_serve(host, port, artifacts, data).await?;
        }
        Commands::Regions { data } => {
            cmd_regions(&data)?;
        }
    }

    Ok(())
}
