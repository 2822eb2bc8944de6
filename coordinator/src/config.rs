use std::{env, path::PathBuf, time::Duration};

use clap::Parser;
use common::MrError;

use crate::ledger::DEFAULT_TASK_TIMEOUT;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_N_REDUCE: usize = 10;

/// Address to listen on:
/// - MR_COORDINATOR_ADDR if set
/// - otherwise 127.0.0.1:8080
fn default_bind_addr() -> String {
    env::var("MR_COORDINATOR_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "coordinator")]
#[command(about = "Hands out map and reduce tasks to workers and tracks the job")]
pub struct CoordinatorArgs {
    /// Input files or glob patterns, one map task per matching file
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Number of reduce partitions
    #[arg(long, default_value_t = DEFAULT_N_REDUCE)]
    pub n_reduce: usize,

    /// Listen address (defaults to MR_COORDINATOR_ADDR or 127.0.0.1:8080)
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory shared with the workers for intermediate and output files
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Assignment age after which a task is handed to someone else
    #[arg(long, default_value_t = DEFAULT_TASK_TIMEOUT.as_secs())]
    pub task_timeout_secs: u64,

    #[arg(long, default_value_t = 1000)]
    pub sweep_interval_ms: u64,

    /// How long to keep answering Exit after the job is done
    #[arg(long, default_value_t = 3)]
    pub shutdown_grace_secs: u64,

    /// Cut inputs into chunks of at most this many lines, one map task each
    #[arg(long)]
    pub split_lines: Option<usize>,

    /// Delete mr-X-Y files once every output is written
    #[arg(long)]
    pub cleanup_intermediate: bool,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub inputs: Vec<String>,
    pub n_reduce: usize,
    pub bind_addr: String,
    pub work_dir: PathBuf,
    pub task_timeout: Duration,
    pub sweep_interval: Duration,
    pub shutdown_grace: Duration,
    pub split_lines: Option<usize>,
    pub cleanup_intermediate: bool,
}

impl CoordinatorConfig {
    /// Defaults for everything but the job itself.
    pub fn new(inputs: Vec<String>, n_reduce: usize, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            n_reduce,
            bind_addr: default_bind_addr(),
            work_dir: work_dir.into(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            sweep_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(3),
            split_lines: None,
            cleanup_intermediate: false,
        }
    }

    pub fn validate(&self) -> Result<(), MrError> {
        if self.n_reduce == 0 {
            return Err(MrError::InvalidConfig("n_reduce must be at least 1".to_string()));
        }
        if self.inputs.is_empty() {
            return Err(MrError::InvalidConfig("no input files given".to_string()));
        }
        if self.task_timeout.is_zero() {
            return Err(MrError::InvalidConfig("task timeout must be positive".to_string()));
        }
        if self.sweep_interval.is_zero() {
            return Err(MrError::InvalidConfig("sweep interval must be positive".to_string()));
        }
        if self.split_lines == Some(0) {
            return Err(MrError::InvalidConfig("split size must be at least one line".to_string()));
        }
        Ok(())
    }
}

impl TryFrom<CoordinatorArgs> for CoordinatorConfig {
    type Error = MrError;

    fn try_from(args: CoordinatorArgs) -> Result<Self, Self::Error> {
        let config = CoordinatorConfig {
            inputs: args.inputs,
            n_reduce: args.n_reduce,
            bind_addr: args.bind.unwrap_or_else(default_bind_addr),
            work_dir: args.work_dir,
            task_timeout: Duration::from_secs(args.task_timeout_secs),
            sweep_interval: Duration::from_millis(args.sweep_interval_ms),
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
            split_lines: args.split_lines,
            cleanup_intermediate: args.cleanup_intermediate,
        };
        config.validate()?;
        Ok(config)
    }
}
