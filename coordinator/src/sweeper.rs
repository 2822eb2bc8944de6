use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::state::{LedgerPoisoned, SharedLedger};

/// Background fault detection: on a fixed interval, independent of RPC
/// traffic, releases every task whose assignment outlived the timeout.
/// Stops once the job is Done or the ledger is unusable.
pub async fn run_timeout_sweeper(ledger: SharedLedger, interval: Duration) {
    loop {
        sleep(interval).await;

        match sweep_once(&ledger) {
            Ok(true) => {
                debug!("job done, timeout sweeper stopping");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!("timeout sweeper stopping: {}", e);
                return;
            }
        }
    }
}

/// One pass. Returns whether the job is already Done.
fn sweep_once(ledger: &SharedLedger) -> Result<bool, LedgerPoisoned> {
    if ledger.is_done()? {
        return Ok(true);
    }

    let released = ledger.sweep_timeouts()?;
    if !released.is_empty() {
        let ids: Vec<String> = released.iter().map(ToString::to_string).collect();
        info!("re-queued timed out tasks: {}", ids.join(", "));
    }
    Ok(false)
}
