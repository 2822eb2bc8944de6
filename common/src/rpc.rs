use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Phase, TaskId, TaskKind, WorkerId};

/// Bumped whenever the request/response shapes below change.
pub const PROTOCOL_VERSION: u32 = 1;

/* --------- RequestTask --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub worker_id: WorkerId,
    pub protocol_version: u32,
}

impl TaskRequest {
    pub fn new(worker_id: impl Into<WorkerId>) -> Self {
        Self {
            worker_id: worker_id.into(),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

/// Coordinator's answer to a task request.
///
/// Map and Reduce descriptors carry `n_map`/`n_reduce` so the worker can
/// derive every file name it reads or writes without asking again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskAssignment {
    Map {
        task_index: usize,
        input_path: String,
        n_map: usize,
        n_reduce: usize,
    },
    Reduce {
        task_index: usize,
        n_map: usize,
        n_reduce: usize,
    },
    /// Nothing idle right now, ask again shortly.
    Wait,
    /// Job is finished, the worker should terminate.
    Exit,
}

impl TaskAssignment {
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            TaskAssignment::Map { task_index, .. } => Some(TaskId::map(*task_index)),
            TaskAssignment::Reduce { task_index, .. } => Some(TaskId::reduce(*task_index)),
            TaskAssignment::Wait | TaskAssignment::Exit => None,
        }
    }
}

/* --------- ReportTaskDone / ReportTaskFailed --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteRequest {
    pub worker_id: WorkerId,
    pub kind: TaskKind,
    pub task_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompleteResponse {
    /// false when the report was stale and discarded
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailedRequest {
    pub worker_id: WorkerId,
    pub kind: TaskKind,
    pub task_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailedResponse {
    /// true when the task went back to Idle because of this report
    pub released: bool,
}

/* --------- Done / status --------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneResponse {
    pub done: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub idle: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub phase: Phase,
    pub n_map: usize,
    pub n_reduce: usize,
    pub map: TaskCounts,
    pub reduce: TaskCounts,

    /// Tasks sent back to Idle by a timeout or an explicit failure report.
    pub reassignments: u64,
    /// Completion reports that were discarded.
    pub stale_reports: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
