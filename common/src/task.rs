use serde::{Deserialize, Serialize};
use std::fmt;

pub type WorkerId = String;

/// Which half of the job a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Map,
    Reduce,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Map => write!(f, "map"),
            TaskKind::Reduce => write!(f, "reduce"),
        }
    }
}

/// Job-wide phase. Only moves forward: Mapping -> Reducing -> Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Mapping,
    Reducing,
    Done,
}

impl Phase {
    /// Kind of task served while in this phase (None once the job is Done).
    pub fn task_kind(self) -> Option<TaskKind> {
        match self {
            Phase::Mapping => Some(TaskKind::Map),
            Phase::Reducing => Some(TaskKind::Reduce),
            Phase::Done => None,
        }
    }
}

/// Identity of a task: its phase plus 0-based index within that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub kind: TaskKind,
    pub index: usize,
}

impl TaskId {
    pub fn map(index: usize) -> Self {
        Self {
            kind: TaskKind::Map,
            index,
        }
    }

    pub fn reduce(index: usize) -> Self {
        Self {
            kind: TaskKind::Reduce,
            index,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serves_matching_task_kind() {
        assert_eq!(Phase::Mapping.task_kind(), Some(TaskKind::Map));
        assert_eq!(Phase::Reducing.task_kind(), Some(TaskKind::Reduce));
        assert_eq!(Phase::Done.task_kind(), None);
    }

    #[test]
    fn task_id_display_is_readable() {
        assert_eq!(TaskId::map(3).to_string(), "map#3");
        assert_eq!(TaskId::reduce(0).to_string(), "reduce#0");
    }

    #[test]
    fn task_kind_uses_screaming_case_on_the_wire() {
        let json = serde_json::to_string(&TaskKind::Reduce).unwrap();
        assert_eq!(json, "\"REDUCE\"");
    }
}
