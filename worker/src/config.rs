use std::{env, path::PathBuf, time::Duration};

use clap::Parser;

pub const DEFAULT_COORDINATOR_URL: &str = "http://127.0.0.1:8080";

/// Base URL of the coordinator:
/// - MR_COORDINATOR_URL if set
/// - otherwise http://127.0.0.1:8080 (local runs)
pub fn coordinator_base_url() -> String {
    env::var("MR_COORDINATOR_URL").unwrap_or_else(|_| DEFAULT_COORDINATOR_URL.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Runs map and reduce tasks handed out by the coordinator")]
pub struct WorkerArgs {
    /// Coordinator base URL (defaults to MR_COORDINATOR_URL)
    #[arg(long)]
    pub coordinator: Option<String>,

    /// Map/Reduce application to run (wordcount, indexer)
    #[arg(long, default_value = "wordcount")]
    pub app: String,

    /// Directory shared with the coordinator for intermediate and output files
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Fixed worker id instead of a generated one
    #[arg(long)]
    pub worker_id: Option<String>,

    /// Pause before asking again after a Wait
    #[arg(long, default_value_t = 500)]
    pub wait_ms: u64,

    /// Attempts to reach the coordinator before the first successful reply
    #[arg(long, default_value_t = 20)]
    pub connect_retries: u32,

    #[arg(long, default_value_t = 500)]
    pub connect_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub coordinator_url: String,
    pub app: String,
    pub work_dir: PathBuf,
    pub worker_id: Option<String>,
    pub wait_interval: Duration,
    pub connect_retries: u32,
    pub connect_backoff: Duration,
}

impl WorkerConfig {
    pub fn new(coordinator_url: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            coordinator_url: coordinator_url.into(),
            app: "wordcount".to_string(),
            work_dir: work_dir.into(),
            worker_id: None,
            wait_interval: Duration::from_millis(500),
            connect_retries: 20,
            connect_backoff: Duration::from_millis(500),
        }
    }
}

impl From<WorkerArgs> for WorkerConfig {
    fn from(args: WorkerArgs) -> Self {
        Self {
            coordinator_url: args.coordinator.unwrap_or_else(coordinator_base_url),
            app: args.app,
            work_dir: args.work_dir,
            worker_id: args.worker_id,
            wait_interval: Duration::from_millis(args.wait_ms),
            connect_retries: args.connect_retries,
            connect_backoff: Duration::from_millis(args.connect_backoff_ms),
        }
    }
}
