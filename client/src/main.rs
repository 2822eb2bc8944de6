mod cli;
mod wait;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use worker::CoordinatorClient;

use cli::{render_status, Cli, Commands};
use wait::{wait_for_done, WaitOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = CoordinatorClient::new(cli.coordinator);

    match cli.command {
        Commands::Status { json } => {
            let status = client
                .status()
                .await
                .with_context(|| format!("could not reach {}", client.base_url()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", render_status(&status, Utc::now()));
            }
        }
        Commands::Done => {
            let done = client
                .done()
                .await
                .with_context(|| format!("could not reach {}", client.base_url()))?;
            println!("{}", done);
        }
        Commands::Wait {
            interval_ms,
            connect_retries,
        } => {
            let interval = Duration::from_millis(interval_ms);
            match wait_for_done(&client, interval, connect_retries).await? {
                WaitOutcome::Done => println!("job done"),
                WaitOutcome::CoordinatorGone => {
                    println!("coordinator gone after answering, assuming job done")
                }
            }
        }
    }

    Ok(())
}
