pub mod config;
pub mod handlers;
pub mod job;
pub mod ledger;
pub mod state;
pub mod sweeper;

use std::time::Duration;

use anyhow::{Context, Result};
use common::store::cleanup_intermediate;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use tracing::{info, warn};

pub use config::{CoordinatorArgs, CoordinatorConfig};
use ledger::TaskLedger;
use state::{AppState, LedgerPoisoned, SharedLedger};

/// A job ready to be served: inputs resolved, ledger built.
pub struct Coordinator {
    config: CoordinatorConfig,
    ledger: SharedLedger,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let inputs = job::prepare_map_inputs(&config)?;
        info!(
            "job created: {} map task(s), {} reduce task(s), work dir {}",
            inputs.len(),
            config.n_reduce,
            config.work_dir.display()
        );

        let ledger = SharedLedger::new(TaskLedger::new(inputs, config.n_reduce, config.task_timeout));
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Handle on the ledger, e.g. for the launching program to poll Done.
    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    /// Serves the RPC surface on `listener` until the job is Done and the
    /// grace period has elapsed. Fails only if the ledger became unusable.
    pub async fn run(self, listener: TcpListener) -> Result<()> {
        let app = handlers::build_router(AppState {
            ledger: self.ledger.clone(),
        });

        // fault detection runs regardless of RPC traffic
        let sweeper = tokio::spawn(sweeper::run_timeout_sweeper(
            self.ledger.clone(),
            self.config.sweep_interval,
        ));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let watcher = {
            let ledger = self.ledger.clone();
            let poll = self.config.sweep_interval;
            let grace = self.config.shutdown_grace;
            tokio::spawn(async move {
                let outcome = wait_until_done(&ledger, poll).await;
                if outcome.is_ok() {
                    info!("job done, serving Exit for another {:?}", grace);
                    sleep(grace).await;
                }
                let _ = shutdown_tx.send(());
                outcome
            })
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("coordinator server failed")?;

        sweeper.abort();
        watcher
            .await
            .context("completion watcher panicked")?
            .context("aborting job")?;

        if self.config.cleanup_intermediate {
            let status = self.ledger.status()?;
            match cleanup_intermediate(&self.config.work_dir, status.n_map, status.n_reduce) {
                Ok(n) => info!("removed {} intermediate file(s)", n),
                Err(e) => warn!("could not clean intermediate files: {}", e),
            }
        }

        info!("coordinator finished");
        Ok(())
    }
}

async fn wait_until_done(ledger: &SharedLedger, poll: Duration) -> Result<(), LedgerPoisoned> {
    while !ledger.is_done()? {
        sleep(poll).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn run_returns_once_done_and_grace_elapsed() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.txt");
        fs::write(&input, "a b").unwrap();

        let mut config = CoordinatorConfig::new(
            vec![input.to_string_lossy().into_owned()],
            1,
            tmp.path(),
        );
        config.sweep_interval = Duration::from_millis(20);
        config.shutdown_grace = Duration::from_millis(20);

        let coordinator = Coordinator::new(config).unwrap();
        let ledger = coordinator.ledger();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = tokio::spawn(coordinator.run(listener));

        for _ in 0..2 {
            let id = ledger.next_task("w").unwrap().task_id().unwrap();
            ledger.mark_done(id, "w").unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("coordinator should shut down after the job")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn poisoned_ledger_aborts_the_job() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("a.txt");
        fs::write(&input, "a").unwrap();

        let mut config = CoordinatorConfig::new(
            vec![input.to_string_lossy().into_owned()],
            1,
            tmp.path(),
        );
        config.sweep_interval = Duration::from_millis(20);

        let coordinator = Coordinator::new(config).unwrap();
        coordinator.ledger().poison();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let res = tokio::time::timeout(Duration::from_secs(5), coordinator.run(listener))
            .await
            .expect("coordinator should stop on a poisoned ledger");
        assert!(res.is_err());
    }

    #[test]
    fn new_rejects_missing_inputs() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.txt").to_string_lossy().into_owned();
        let config = CoordinatorConfig::new(vec![missing], 1, tmp.path());
        assert!(Coordinator::new(config).is_err());
    }
}
