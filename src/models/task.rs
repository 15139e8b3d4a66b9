use serde::{Deserialize, Serialize};

/// Task status as reported by the CI agent
///
/// - New / InProgress: not final, the task may still change
/// - Succeeded / Failed / Skipped: final, the task will not change again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    InProgress,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(TaskStatus::New),
            "in_progress" | "in-progress" | "inprogress" => Some(TaskStatus::InProgress),
            "succeeded" => Some(TaskStatus::Succeeded),
            "failed" => Some(TaskStatus::Failed),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }

    /// True once the status can no longer change
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Failed or skipped: counts against the build unless the task is flaky
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub stage_name: String,
    pub flaky: bool,
    pub status: TaskStatus,
    pub attempts: i64,
    pub start_ts: Option<i64>,
    pub end_ts: Option<i64>,
}

impl Task {
    /// Create a new, not yet started task
    pub fn new(stage_name: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            stage_name: stage_name.to_string(),
            flaky: false,
            status: TaskStatus::New,
            attempts: 1,
            start_ts: None,
            end_ts: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn flaky(mut self, flaky: bool) -> Self {
        self.flaky = flaky;
        self
    }
}

/// A task as it was observed in one stage of one build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub key: Option<i64>,
    pub task: Task,
}

impl From<Task> for TaskEntry {
    fn from(task: Task) -> Self {
        Self { key: None, task }
    }
}
