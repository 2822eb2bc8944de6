use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use common::{JobStatus, TaskCounts};

pub const DEFAULT_COORDINATOR_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Small CLI to inspect a running MapReduce job")]
pub struct Cli {
    /// Coordinator base URL
    #[arg(long, env = "MR_COORDINATOR_URL", default_value = DEFAULT_COORDINATOR_URL)]
    pub coordinator: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shows phase, task counters and fault statistics
    Status {
        /// Print the raw JSON instead of the table
        #[arg(long)]
        json: bool,
    },
    /// Prints true/false depending on whether the job has finished
    Done,
    /// Blocks until the job finishes (or the coordinator goes away after answering)
    Wait {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Attempts to reach the coordinator before its first reply
        #[arg(long, default_value_t = 20)]
        connect_retries: u32,
    },
}

fn counts_line(label: &str, c: &TaskCounts) -> String {
    format!(
        "  {:<7} idle={} in_progress={} completed={}",
        label, c.idle, c.in_progress, c.completed
    )
}

/// Human-readable view of the job status. `now` is only used for the
/// elapsed time while the job is still running.
pub fn render_status(status: &JobStatus, now: DateTime<Utc>) -> String {
    let end = status.finished_at.unwrap_or(now);
    let elapsed = (end - status.started_at).num_milliseconds() as f64 / 1000.0;

    let mut out = Vec::new();
    out.push(format!(
        "Job: phase={:?} maps={} reduces={}",
        status.phase, status.n_map, status.n_reduce
    ));
    out.push(counts_line("map", &status.map));
    out.push(counts_line("reduce", &status.reduce));
    out.push(format!(
        "  reassignments={} stale_reports={}",
        status.reassignments, status.stale_reports
    ));
    match status.finished_at {
        Some(t) => out.push(format!("  finished at {} ({:.1}s)", t.to_rfc3339(), elapsed)),
        None => out.push(format!("  running for {:.1}s", elapsed)),
    }
    out.join("\n")
}
