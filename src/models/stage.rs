use serde::{Deserialize, Serialize};
use crate::models::{TaskEntry, TaskStatus};

/// Stage model
/// One named group of tasks within a single build, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Option<i64>,
    pub name: String,
    pub tasks: Vec<TaskEntry>,
}

impl Stage {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            tasks: Vec::new(),
        }
    }

    /// Number of tasks in this stage with the given status
    pub fn count_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|entry| entry.task.status == status).count()
    }
}
