//! Trendline - anticipates CI build health from recent build history
//!
//! This library provides the core functionality for Trendline, including:
//! - The trend engine that classifies build history (`trend`)
//! - The public status handler and its status source seam (`status`)
//! - Data models for builds, stages and tasks
//! - A SQLite build ledger with migrations and a repository layer
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```
//! use trendline::models::{BuildResult, BuildStatus, Stage, Task, TaskStatus};
//! use trendline::trend::compute_trend;
//!
//! let mut stage = Stage::new("tests");
//! stage.tasks.push(Task::new("tests", "unit").with_status(TaskStatus::Succeeded).into());
//! let history = vec![BuildStatus::new("abc123", "main").with_stage(stage)];
//!
//! assert_eq!(compute_trend(&history), BuildResult::Succeeded);
//! ```

pub mod config;
pub mod db;
pub mod models;
pub mod repo;
pub mod trend;
pub mod status;
pub mod cli;
pub mod utils;
