use serde::{Deserialize, Serialize};
use std::fmt;
use crate::models::{Stage, TaskEntry, TaskStatus};

/// Anticipated outcome of the current build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildResult {
    New,
    WillFail,
    Succeeded,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::New => "New",
            BuildResult::WillFail => "WillFail",
            BuildResult::Succeeded => "Succeeded",
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One build's full status record: the checklist (commit, branch) plus its stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStatus {
    pub id: Option<i64>,
    pub uuid: String,
    pub commit: String,
    pub branch: String,
    pub created_ts: i64,
    pub stages: Vec<Stage>,
}

impl BuildStatus {
    /// Create a new build record with no stages
    pub fn new(commit: &str, branch: &str) -> Self {
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            commit: commit.to_string(),
            branch: branch.to_string(),
            created_ts: chrono::Utc::now().timestamp(),
            stages: Vec::new(),
        }
    }

    /// Builder helper: append a stage
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// All task entries across stages, in stage order then task order
    pub fn task_entries(&self) -> impl Iterator<Item = &TaskEntry> {
        self.stages.iter().flat_map(|stage| stage.tasks.iter())
    }

    pub fn task_count(&self) -> usize {
        self.stages.iter().map(|stage| stage.tasks.len()).sum()
    }

    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.stages.iter().map(|stage| stage.count_status(status)).sum()
    }
}
