//! Task ledger: the coordinator's source of truth about every task.
//!
//! The ledger is plain data. Callers serialize access to it (see
//! `state::SharedLedger`), which is what makes `next_task`, `mark_done`
//! and `sweep_timeouts` linearizable.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{JobStatus, Phase, TaskAssignment, TaskCounts, TaskId, TaskKind, WorkerId};
use tracing::{debug, info, warn};

/// Age after which an InProgress assignment is presumed dead.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    Map { input_path: String },
    Reduce { partition: usize },
}

#[derive(Debug, Clone)]
struct TaskEntry {
    id: TaskId,
    payload: TaskPayload,
    state: TaskState,
    worker: Option<WorkerId>,
    assigned_at: Option<Instant>,
}

impl TaskEntry {
    fn new(id: TaskId, payload: TaskPayload) -> Self {
        Self {
            id,
            payload,
            state: TaskState::Idle,
            worker: None,
            assigned_at: None,
        }
    }

    fn release(&mut self) {
        self.state = TaskState::Idle;
        self.worker = None;
        self.assigned_at = None;
    }
}

/// Outcome of a completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    Stale,
}

#[derive(Debug)]
pub struct TaskLedger {
    phase: Phase,
    map_tasks: Vec<TaskEntry>,
    reduce_tasks: Vec<TaskEntry>,
    timeout: Duration,

    reassignments: u64,
    stale_reports: u64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TaskLedger {
    /// One map task per input, `n_reduce` reduce tasks, everything Idle.
    pub fn new(inputs: Vec<String>, n_reduce: usize, timeout: Duration) -> Self {
        let map_tasks = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input_path)| TaskEntry::new(TaskId::map(i), TaskPayload::Map { input_path }))
            .collect();
        let reduce_tasks = (0..n_reduce)
            .map(|r| TaskEntry::new(TaskId::reduce(r), TaskPayload::Reduce { partition: r }))
            .collect();

        let mut ledger = Self {
            phase: Phase::Mapping,
            map_tasks,
            reduce_tasks,
            timeout,
            reassignments: 0,
            stale_reports: 0,
            started_at: Utc::now(),
            finished_at: None,
        };
        // a job with no inputs has nothing to map
        ledger.advance_phase();
        ledger
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn n_map(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn n_reduce(&self) -> usize {
        self.reduce_tasks.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.tasks(id.kind).get(id.index).map(|t| t.state)
    }

    /// Worker whose report completed the task, if it is Completed.
    pub fn completed_by(&self, id: TaskId) -> Option<&str> {
        self.tasks(id.kind)
            .get(id.index)
            .filter(|t| t.state == TaskState::Completed)
            .and_then(|t| t.worker.as_deref())
    }

    fn tasks(&self, kind: TaskKind) -> &[TaskEntry] {
        match kind {
            TaskKind::Map => &self.map_tasks,
            TaskKind::Reduce => &self.reduce_tasks,
        }
    }

    fn tasks_mut(&mut self, kind: TaskKind) -> &mut [TaskEntry] {
        match kind {
            TaskKind::Map => &mut self.map_tasks,
            TaskKind::Reduce => &mut self.reduce_tasks,
        }
    }

    fn all_completed(&self, kind: TaskKind) -> bool {
        self.tasks(kind).iter().all(|t| t.state == TaskState::Completed)
    }

    /// Moves the phase forward as far as the current task states allow.
    fn advance_phase(&mut self) {
        loop {
            let next = match self.phase {
                Phase::Mapping if self.all_completed(TaskKind::Map) => Phase::Reducing,
                Phase::Reducing if self.all_completed(TaskKind::Reduce) => Phase::Done,
                _ => return,
            };
            info!("phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            if next == Phase::Done {
                self.finished_at = Some(Utc::now());
            }
        }
    }

    /// Hands the lowest-index Idle task of the current phase to `worker_id`.
    ///
    /// Returns Wait when the phase still has tasks in flight and Exit once
    /// the job is Done.
    pub fn next_task(&mut self, worker_id: &str, now: Instant) -> TaskAssignment {
        self.advance_phase();

        let Some(kind) = self.phase.task_kind() else {
            return TaskAssignment::Exit;
        };
        if kind == TaskKind::Reduce {
            debug_assert!(self.all_completed(TaskKind::Map));
        }

        let n_map = self.n_map();
        let n_reduce = self.n_reduce();

        let Some(task) = self
            .tasks_mut(kind)
            .iter_mut()
            .find(|t| t.state == TaskState::Idle)
        else {
            debug!("no idle {} task for worker {}, telling it to wait", kind, worker_id);
            return TaskAssignment::Wait;
        };

        task.state = TaskState::InProgress;
        task.worker = Some(worker_id.to_string());
        task.assigned_at = Some(now);
        info!("assigning {} to worker {}", task.id, worker_id);

        match &task.payload {
            TaskPayload::Map { input_path } => TaskAssignment::Map {
                task_index: task.id.index,
                input_path: input_path.clone(),
                n_map,
                n_reduce,
            },
            TaskPayload::Reduce { partition } => TaskAssignment::Reduce {
                task_index: *partition,
                n_map,
                n_reduce,
            },
        }
    }

    /// Records that `worker_id` finished `id`.
    ///
    /// Only the worker currently holding the task can complete it; anything
    /// else (already Completed, timed out and back to Idle, reassigned,
    /// unknown index) is Stale and leaves the ledger untouched.
    pub fn mark_done(&mut self, id: TaskId, worker_id: &str) -> Completion {
        let accepted = match self.tasks_mut(id.kind).get_mut(id.index) {
            Some(task)
                if task.state == TaskState::InProgress
                    && task.worker.as_deref() == Some(worker_id) =>
            {
                task.state = TaskState::Completed;
                task.assigned_at = None;
                true
            }
            _ => false,
        };

        if !accepted {
            self.stale_reports += 1;
            warn!("discarding stale completion of {} from worker {}", id, worker_id);
            return Completion::Stale;
        }

        info!("{} completed by worker {}", id, worker_id);
        self.advance_phase();
        Completion::Accepted
    }

    /// Explicit failure report: puts the task back to Idle right away
    /// instead of waiting for the timeout. Same ownership rule as
    /// `mark_done`.
    pub fn mark_failed(&mut self, id: TaskId, worker_id: &str) -> bool {
        match self.tasks_mut(id.kind).get_mut(id.index) {
            Some(task)
                if task.state == TaskState::InProgress
                    && task.worker.as_deref() == Some(worker_id) =>
            {
                task.release();
            }
            _ => {
                debug!("ignoring failure report of {} from worker {}", id, worker_id);
                return false;
            }
        }
        self.reassignments += 1;
        warn!("worker {} failed {}, task is idle again", worker_id, id);
        true
    }

    /// Releases every InProgress task assigned more than `timeout` ago.
    /// Returns the ids that went back to Idle.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Vec<TaskId> {
        let timeout = self.timeout;
        let mut released = Vec::new();

        for task in self.map_tasks.iter_mut().chain(self.reduce_tasks.iter_mut()) {
            if task.state != TaskState::InProgress {
                continue;
            }
            let Some(assigned_at) = task.assigned_at else {
                continue;
            };
            let age = now.saturating_duration_since(assigned_at);
            if age > timeout {
                warn!(
                    "{} timed out on worker {} after {:?}, releasing",
                    task.id,
                    task.worker.as_deref().unwrap_or("?"),
                    age
                );
                task.release();
                released.push(task.id);
            }
        }

        self.reassignments += released.len() as u64;
        released
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            phase: self.phase,
            n_map: self.n_map(),
            n_reduce: self.n_reduce(),
            map: counts(&self.map_tasks),
            reduce: counts(&self.reduce_tasks),
            reassignments: self.reassignments,
            stale_reports: self.stale_reports,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

fn counts(tasks: &[TaskEntry]) -> TaskCounts {
    let mut c = TaskCounts::default();
    for t in tasks {
        match t.state {
            TaskState::Idle => c.idle += 1,
            TaskState::InProgress => c.in_progress += 1,
            TaskState::Completed => c.completed += 1,
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(n_map: usize, n_reduce: usize) -> TaskLedger {
        let inputs = (0..n_map).map(|i| format!("pg-{}.txt", i)).collect();
        TaskLedger::new(inputs, n_reduce, DEFAULT_TASK_TIMEOUT)
    }

    fn take(l: &mut TaskLedger, worker: &str, now: Instant) -> TaskId {
        l.next_task(worker, now)
            .task_id()
            .expect("expected a task assignment")
    }

    /// Runs every task of the current phase to completion with one worker.
    fn finish_phase(l: &mut TaskLedger, now: Instant) {
        while let Some(id) = l.next_task("w", now).task_id() {
            assert_eq!(l.mark_done(id, "w"), Completion::Accepted);
            if l.tasks(id.kind).iter().all(|t| t.state == TaskState::Completed) {
                break;
            }
        }
    }

    #[test]
    fn assigns_lowest_index_idle_map_task_with_descriptor() {
        let mut l = ledger(3, 2);
        let now = Instant::now();

        let a = l.next_task("w1", now);
        assert_eq!(
            a,
            TaskAssignment::Map {
                task_index: 0,
                input_path: "pg-0.txt".to_string(),
                n_map: 3,
                n_reduce: 2,
            }
        );
        assert_eq!(take(&mut l, "w2", now), TaskId::map(1));
        assert_eq!(l.task_state(TaskId::map(0)), Some(TaskState::InProgress));
    }

    #[test]
    fn waits_while_stragglers_hold_the_last_tasks() {
        let mut l = ledger(1, 1);
        let now = Instant::now();
        take(&mut l, "w1", now);

        assert_eq!(l.next_task("w2", now), TaskAssignment::Wait);
        assert_eq!(l.phase(), Phase::Mapping);
    }

    #[test]
    fn no_reduce_task_before_every_map_task_completes() {
        let mut l = ledger(2, 2);
        let now = Instant::now();
        let m0 = take(&mut l, "w1", now);
        let m1 = take(&mut l, "w2", now);
        l.mark_done(m0, "w1");

        // one map still running: other workers must wait, not reduce
        assert_eq!(l.next_task("w3", now), TaskAssignment::Wait);

        l.mark_done(m1, "w2");
        assert_eq!(l.phase(), Phase::Reducing);
        assert_eq!(
            l.next_task("w3", now),
            TaskAssignment::Reduce {
                task_index: 0,
                n_map: 2,
                n_reduce: 2,
            }
        );
    }

    #[test]
    fn completes_and_then_only_answers_exit() {
        let mut l = ledger(2, 3);
        let now = Instant::now();

        finish_phase(&mut l, now);
        assert_eq!(l.phase(), Phase::Reducing);
        finish_phase(&mut l, now);

        assert!(l.is_done());
        for _ in 0..3 {
            assert_eq!(l.next_task("late", now), TaskAssignment::Exit);
        }
        let status = l.status();
        assert_eq!(status.reduce.completed, 3);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn duplicate_completion_is_stale_and_never_double_counts() {
        let mut l = ledger(1, 1);
        let now = Instant::now();
        let id = take(&mut l, "w1", now);

        assert_eq!(l.mark_done(id, "w1"), Completion::Accepted);
        assert_eq!(l.mark_done(id, "w1"), Completion::Stale);
        assert_eq!(l.task_state(id), Some(TaskState::Completed));
        assert_eq!(l.status().map.completed, 1);
        assert_eq!(l.status().stale_reports, 1);
    }

    #[test]
    fn report_from_non_holder_is_stale() {
        let mut l = ledger(1, 1);
        let now = Instant::now();
        let id = take(&mut l, "w1", now);

        assert_eq!(l.mark_done(id, "intruder"), Completion::Stale);
        assert_eq!(l.task_state(id), Some(TaskState::InProgress));
    }

    #[test]
    fn out_of_range_report_is_stale() {
        let mut l = ledger(1, 1);
        assert_eq!(l.mark_done(TaskId::map(9), "w1"), Completion::Stale);
        assert_eq!(l.mark_done(TaskId::reduce(9), "w1"), Completion::Stale);
    }

    #[test]
    fn sweep_releases_only_tasks_older_than_ten_seconds() {
        let mut l = ledger(2, 1);
        let t0 = Instant::now();
        let old = take(&mut l, "slow", t0);
        let young = take(&mut l, "fast", t0 + Duration::from_secs(5));

        // exactly at the threshold is not yet "exceeds"
        assert!(l.sweep_timeouts(t0 + Duration::from_secs(10)).is_empty());

        let released = l.sweep_timeouts(t0 + Duration::from_secs(11));
        assert_eq!(released, vec![old]);
        assert_eq!(l.task_state(old), Some(TaskState::Idle));
        assert_eq!(l.task_state(young), Some(TaskState::InProgress));
        assert_eq!(l.status().reassignments, 1);
    }

    #[test]
    fn timed_out_task_is_reassigned_and_late_report_is_stale() {
        let mut l = ledger(1, 1);
        let t0 = Instant::now();
        let id = take(&mut l, "straggler", t0);

        l.sweep_timeouts(t0 + Duration::from_secs(11));
        let again = take(&mut l, "replacement", t0 + Duration::from_secs(11));
        assert_eq!(again, id);

        // the straggler wakes up after the replacement took over
        assert_eq!(l.mark_done(id, "straggler"), Completion::Stale);
        assert_eq!(l.mark_done(id, "replacement"), Completion::Accepted);
        assert_eq!(l.completed_by(id), Some("replacement"));
    }

    #[test]
    fn straggler_reporting_after_replacement_finished_is_stale() {
        let mut l = ledger(1, 1);
        let t0 = Instant::now();
        let id = take(&mut l, "straggler", t0);
        l.sweep_timeouts(t0 + Duration::from_secs(11));
        take(&mut l, "replacement", t0 + Duration::from_secs(11));

        assert_eq!(l.mark_done(id, "replacement"), Completion::Accepted);
        assert_eq!(l.mark_done(id, "straggler"), Completion::Stale);
        assert_eq!(l.task_state(id), Some(TaskState::Completed));
        assert_eq!(l.status().map.completed, 1);
    }

    #[test]
    fn sweep_ignores_completed_tasks() {
        let mut l = ledger(1, 1);
        let t0 = Instant::now();
        let id = take(&mut l, "w1", t0);
        l.mark_done(id, "w1");

        assert!(l.sweep_timeouts(t0 + Duration::from_secs(60)).is_empty());
        assert_eq!(l.task_state(id), Some(TaskState::Completed));
    }

    #[test]
    fn reduce_tasks_use_the_same_timeout_rule() {
        let mut l = ledger(1, 2);
        let t0 = Instant::now();
        finish_phase(&mut l, t0);
        let r = take(&mut l, "slow", t0);
        assert_eq!(r.kind, TaskKind::Reduce);

        let released = l.sweep_timeouts(t0 + Duration::from_secs(11));
        assert_eq!(released, vec![r]);
    }

    #[test]
    fn failure_report_releases_task_immediately() {
        let mut l = ledger(2, 1);
        let now = Instant::now();
        let id = take(&mut l, "w1", now);

        assert!(!l.mark_failed(id, "someone-else"));
        assert!(l.mark_failed(id, "w1"));
        assert_eq!(l.task_state(id), Some(TaskState::Idle));
        // lowest index goes out first again
        assert_eq!(take(&mut l, "w2", now), id);
    }

    #[test]
    fn done_never_flips_back() {
        let mut l = ledger(1, 1);
        let now = Instant::now();
        assert!(!l.is_done());
        finish_phase(&mut l, now);
        assert!(!l.is_done());
        finish_phase(&mut l, now);
        assert!(l.is_done());

        l.sweep_timeouts(now + Duration::from_secs(3600));
        l.mark_done(TaskId::reduce(0), "w");
        l.next_task("w", now);
        assert!(l.is_done());
    }

    #[test]
    fn empty_input_list_starts_in_reduce_phase() {
        let l = ledger(0, 2);
        assert_eq!(l.phase(), Phase::Reducing);
    }
}
