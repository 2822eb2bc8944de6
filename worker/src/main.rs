use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use worker::{Worker, WorkerArgs, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=debug,reqwest=info")),
        )
        .init();

    let config = WorkerConfig::from(WorkerArgs::parse());
    let app = common::apps::by_name(&config.app).with_context(|| {
        format!(
            "available applications: {}",
            common::apps::AVAILABLE_APPS.join(", ")
        )
    })?;

    let summary = Worker::new(config, app).run().await?;
    info!("worker finished: {}", serde_json::to_string(&summary)?);
    Ok(())
}
