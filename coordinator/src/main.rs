use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coordinator::{Coordinator, CoordinatorArgs, CoordinatorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=debug,tower_http=info")),
        )
        .init();

    let config = CoordinatorConfig::try_from(CoordinatorArgs::parse())?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("coordinator listening on {}", listener.local_addr()?);

    let coordinator = Coordinator::new(config)?;
    coordinator.run(listener).await
}
