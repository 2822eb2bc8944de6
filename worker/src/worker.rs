use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use common::{MapReduceApp, TaskAssignment, TaskId, WorkerId};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::CoordinatorClient;
use crate::config::WorkerConfig;
use crate::exec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Coordinator answered Exit.
    JobDone,
    /// Coordinator stopped answering after we had talked to it; the job is
    /// taken to be over.
    CoordinatorGone,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerSummary {
    pub worker_id: WorkerId,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub stale_reports: u64,
    pub exit_reason: ExitReason,
}

/// What happened to one executed task, from the loop's point of view.
enum Reported {
    Continue,
    CoordinatorGone,
}

/// Generates `<hostname>-<short uuid>`, unique across concurrent workers.
pub fn generate_worker_id() -> WorkerId {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "worker".to_string());
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", host, &uuid[..8])
}

pub struct Worker {
    id: WorkerId,
    config: WorkerConfig,
    app: Arc<dyn MapReduceApp>,
    client: CoordinatorClient,
    summary: WorkerSummary,
}

impl Worker {
    pub fn new(config: WorkerConfig, app: Arc<dyn MapReduceApp>) -> Self {
        let id = config.worker_id.clone().unwrap_or_else(generate_worker_id);
        let client = CoordinatorClient::new(config.coordinator_url.clone());
        let summary = WorkerSummary {
            worker_id: id.clone(),
            tasks_completed: 0,
            tasks_failed: 0,
            stale_reports: 0,
            exit_reason: ExitReason::JobDone,
        };
        Self {
            id,
            config,
            app,
            client,
            summary,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Main loop:
    /// - asks for a task
    /// - Exit: stop; Wait: sleep and ask again
    /// - Map/Reduce: execute, then report
    ///
    /// Before the first reply a failed call is retried (the coordinator may
    /// not be up yet). After that, a failed call means the job is over.
    pub async fn run(mut self) -> Result<WorkerSummary> {
        info!(
            "worker {} starting against {} (app={})",
            self.id,
            self.client.base_url(),
            self.app.name()
        );

        let mut contacted = false;
        let mut attempts: u32 = 0;

        loop {
            let assignment = match self.client.request_task(&self.id).await {
                Ok(a) => {
                    contacted = true;
                    a
                }
                Err(e) if !contacted => {
                    attempts += 1;
                    if attempts > self.config.connect_retries {
                        return Err(anyhow!(e).context(format!(
                            "coordinator at {} unreachable after {} attempts",
                            self.client.base_url(),
                            attempts
                        )));
                    }
                    warn!(
                        "coordinator not reachable yet ({}), retry {}/{} in {:?}",
                        e, attempts, self.config.connect_retries, self.config.connect_backoff
                    );
                    sleep(self.config.connect_backoff).await;
                    continue;
                }
                Err(e) => {
                    info!("coordinator unreachable ({}), assuming the job is finished", e);
                    return Ok(self.finish(ExitReason::CoordinatorGone));
                }
            };

            match assignment {
                TaskAssignment::Exit => {
                    info!("coordinator says the job is done, exiting");
                    return Ok(self.finish(ExitReason::JobDone));
                }
                TaskAssignment::Wait => {
                    debug!("nothing to do yet, waiting {:?}", self.config.wait_interval);
                    sleep(self.config.wait_interval).await;
                }
                task => {
                    if let Reported::CoordinatorGone = self.execute_and_report(task).await {
                        return Ok(self.finish(ExitReason::CoordinatorGone));
                    }
                }
            }
        }
    }

    fn finish(mut self, reason: ExitReason) -> WorkerSummary {
        self.summary.exit_reason = reason;
        self.summary
    }

    async fn execute_and_report(&mut self, task: TaskAssignment) -> Reported {
        let Some(task_id) = task.task_id() else {
            return Reported::Continue;
        };
        info!("worker {} got {}", self.id, task_id);

        let app = Arc::clone(&self.app);
        let work_dir: PathBuf = self.config.work_dir.clone();
        let handle = tokio::task::spawn_blocking(move || match task {
            TaskAssignment::Map {
                task_index,
                input_path,
                n_reduce,
                ..
            } => exec::execute_map(app.as_ref(), &work_dir, task_index, &input_path, n_reduce),
            TaskAssignment::Reduce {
                task_index, n_map, ..
            } => exec::execute_reduce(app.as_ref(), &work_dir, task_index, n_map),
            TaskAssignment::Wait | TaskAssignment::Exit => Ok(0),
        });

        let failure = match handle.await {
            Ok(Ok(produced)) => {
                debug!("{} produced {} record(s)", task_id, produced);
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(e) => Some(format!("task panicked: {}", e)),
        };

        match failure {
            None => self.report_done(task_id).await,
            Some(reason) => {
                warn!("{} failed on worker {}: {}", task_id, self.id, reason);
                self.summary.tasks_failed += 1;
                let reported = self.report_failed(task_id, reason).await;
                // a callback that keeps failing must not spin the loop
                sleep(self.config.wait_interval).await;
                reported
            }
        }
    }

    async fn report_done(&mut self, task_id: TaskId) -> Reported {
        match self.client.report_done(&self.id, task_id).await {
            Ok(true) => {
                info!("{} done and accepted", task_id);
                self.summary.tasks_completed += 1;
                Reported::Continue
            }
            Ok(false) => {
                warn!("{} done but report was stale, another worker owns it", task_id);
                self.summary.stale_reports += 1;
                Reported::Continue
            }
            Err(e) => {
                info!("could not report {} ({}), assuming the job is finished", task_id, e);
                Reported::CoordinatorGone
            }
        }
    }

    async fn report_failed(&mut self, task_id: TaskId, reason: String) -> Reported {
        match self.client.report_failed(&self.id, task_id, reason).await {
            Ok(released) => {
                debug!("failure of {} reported (released={})", task_id, released);
                Reported::Continue
            }
            Err(e) => {
                info!("could not report failure of {} ({}), assuming the job is finished", task_id, e);
                Reported::CoordinatorGone
            }
        }
    }
}
