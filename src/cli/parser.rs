// CLI parsing utilities for task specs
//
// A task spec names one task of a build:
//
//     stage:name[=status][+flaky]
//
// e.g. `tests:unit=failed+flaky`, `build:compile=succeeded`, `deploy:publish`

use crate::cli::error::{validate_stage_name, validate_task_name};
use crate::models::TaskStatus;
use crate::utils::fuzzy::closest_match;

const FLAKY_SUFFIX: &str = "+flaky";

const STATUS_NAMES: &[&str] = &["new", "in_progress", "succeeded", "failed", "skipped"];

/// Parsed task spec from command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub stage: String,
    pub name: String,
    pub status: Option<TaskStatus>,
    pub flaky: bool,
}

/// Task spec parse error
#[derive(Debug, PartialEq, Eq)]
pub enum TaskSpecError {
    MissingStage {
        token: String,
    },
    InvalidName {
        message: String,
    },
    UnknownStatus {
        status: String,
        suggestion: Option<String>,
    },
}

impl std::fmt::Display for TaskSpecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskSpecError::MissingStage { token } => {
                write!(f, "Invalid task '{}'. Expected stage:name[=status][+flaky]", token)
            }
            TaskSpecError::InvalidName { message } => {
                write!(f, "{}", message)
            }
            TaskSpecError::UnknownStatus { status, suggestion: Some(suggestion) } => {
                write!(f, "Unknown status '{}'\n  Did you mean '{}'?", status, suggestion)
            }
            TaskSpecError::UnknownStatus { status, suggestion: None } => {
                write!(f, "Unknown status '{}'. Valid statuses: {}", status, STATUS_NAMES.join(", "))
            }
        }
    }
}

/// Parse a task status, suggesting the closest valid name on a typo
pub fn parse_status(value: &str) -> Result<TaskStatus, TaskSpecError> {
    TaskStatus::from_str(&value.to_lowercase()).ok_or_else(|| TaskSpecError::UnknownStatus {
        status: value.to_string(),
        suggestion: closest_match(value, STATUS_NAMES, 2).map(str::to_string),
    })
}

/// Parse a single `stage:name[=status][+flaky]` token
pub fn parse_task_spec(token: &str) -> Result<TaskSpec, TaskSpecError> {
    let (body, flaky) = match token.strip_suffix(FLAKY_SUFFIX) {
        Some(body) => (body, true),
        None => (token, false),
    };

    let (target, status) = match body.split_once('=') {
        Some((target, status)) => (target, Some(parse_status(status)?)),
        None => (body, None),
    };

    let (stage, name) = target.split_once(':').ok_or_else(|| TaskSpecError::MissingStage {
        token: token.to_string(),
    })?;

    validate_stage_name(stage).map_err(|message| TaskSpecError::InvalidName { message })?;
    validate_task_name(name).map_err(|message| TaskSpecError::InvalidName { message })?;

    Ok(TaskSpec {
        stage: stage.to_string(),
        name: name.to_string(),
        status,
        flaky,
    })
}

/// Parse every token, failing on the first invalid one
pub fn parse_task_specs(tokens: &[String]) -> Result<Vec<TaskSpec>, TaskSpecError> {
    tokens.iter().map(|token| parse_task_spec(token)).collect()
}
