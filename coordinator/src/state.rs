use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use common::{JobStatus, TaskAssignment, TaskId};
use thiserror::Error;

use crate::ledger::{Completion, TaskLedger};

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
}

/// The ledger lock was poisoned by a panic while held. The ledger may be
/// half-updated, so the job cannot continue.
#[derive(Debug, Error)]
#[error("task ledger lock poisoned, coordinator state is unrecoverable")]
pub struct LedgerPoisoned;

/// The only handle through which the ledger is touched. Every operation
/// runs start to finish under one lock, never across an `.await`.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<TaskLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: TaskLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut TaskLedger) -> T) -> Result<T, LedgerPoisoned> {
        let mut guard = self.inner.lock().map_err(|_| LedgerPoisoned)?;
        Ok(f(&mut guard))
    }

    pub fn next_task(&self, worker_id: &str) -> Result<TaskAssignment, LedgerPoisoned> {
        self.with(|l| l.next_task(worker_id, Instant::now()))
    }

    pub fn mark_done(&self, id: TaskId, worker_id: &str) -> Result<Completion, LedgerPoisoned> {
        self.with(|l| l.mark_done(id, worker_id))
    }

    pub fn mark_failed(&self, id: TaskId, worker_id: &str) -> Result<bool, LedgerPoisoned> {
        self.with(|l| l.mark_failed(id, worker_id))
    }

    pub fn sweep_timeouts(&self) -> Result<Vec<TaskId>, LedgerPoisoned> {
        self.with(|l| l.sweep_timeouts(Instant::now()))
    }

    pub fn is_done(&self) -> Result<bool, LedgerPoisoned> {
        self.with(|l| l.is_done())
    }

    pub fn status(&self) -> Result<JobStatus, LedgerPoisoned> {
        self.with(|l| l.status())
    }

    pub fn completed_by(&self, id: TaskId) -> Result<Option<String>, LedgerPoisoned> {
        self.with(|l| l.completed_by(id).map(str::to_string))
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let inner = self.inner.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("poisoning the ledger on purpose");
        })
        .join();
    }
}
