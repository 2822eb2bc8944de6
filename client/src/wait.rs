use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::time::sleep;
use worker::CoordinatorClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The coordinator answered Done.
    Done,
    /// It answered at least once, then stopped answering.
    CoordinatorGone,
}

/// Polls Done every `interval` until it turns true.
///
/// Until the first reply a failed call is retried up to `connect_retries`
/// times, like the worker does. Only after that is a lost coordinator read
/// as a finished job.
pub async fn wait_for_done(
    client: &CoordinatorClient,
    interval: Duration,
    connect_retries: u32,
) -> Result<WaitOutcome> {
    let mut contacted = false;
    let mut attempts: u32 = 0;

    loop {
        match client.done().await {
            Ok(true) => return Ok(WaitOutcome::Done),
            Ok(false) => contacted = true,
            Err(e) if !contacted => {
                attempts += 1;
                if attempts > connect_retries {
                    return Err(anyhow!(e).context(format!(
                        "coordinator at {} unreachable after {} attempts",
                        client.base_url(),
                        attempts
                    )));
                }
            }
            Err(_) => return Ok(WaitOutcome::CoordinatorGone),
        }
        sleep(interval).await;
    }
}
