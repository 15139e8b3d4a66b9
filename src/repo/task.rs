use rusqlite::{Connection, OptionalExtension};
use crate::models::{Task, TaskStatus};
use crate::repo::BuildRepo;
use anyhow::{Context, Result};

/// Task repository for database operations
pub struct TaskRepo;

impl TaskRepo {
    /// Insert or update a task in a build.
    ///
    /// The stage is created on first use. A task name may appear only once per
    /// build, so updating a task through a different stage is an error.
    /// `flaky: None` keeps the stored flag (false for new tasks).
    /// Joins the caller's transaction when one is open.
    pub fn upsert(
        conn: &Connection,
        build_id: i64,
        stage_name: &str,
        name: &str,
        status: TaskStatus,
        flaky: Option<bool>,
    ) -> Result<Task> {
        let tx = if conn.is_autocommit() {
            Some(conn.unchecked_transaction()?)
        } else {
            None
        };

        let existing = Self::get_with_id(conn, build_id, name)?;
        let now = chrono::Utc::now().timestamp();

        let task = match existing {
            Some((task_id, mut task)) => {
                if task.stage_name != stage_name {
                    anyhow::bail!(
                        "Task '{}' already belongs to stage '{}' in build {}",
                        name, task.stage_name, build_id
                    );
                }
                apply_transition(&mut task, status, now);
                if let Some(flaky) = flaky {
                    task.flaky = flaky;
                }

                conn.execute(
                    "UPDATE tasks SET status = ?1, flaky = ?2, attempts = ?3, start_ts = ?4, end_ts = ?5
                     WHERE id = ?6",
                    rusqlite::params![
                        task.status.as_str(),
                        task.flaky,
                        task.attempts,
                        task.start_ts,
                        task.end_ts,
                        task_id
                    ],
                )
                .with_context(|| format!("Failed to update task '{}' in build {}", name, build_id))?;
                task
            }
            None => {
                let stage_id = BuildRepo::add_stage(conn, build_id, stage_name)?;
                let mut task = Task::new(stage_name, name).flaky(flaky.unwrap_or(false));
                apply_transition(&mut task, status, now);

                conn.execute(
                    "INSERT INTO tasks (build_id, stage_id, name, status, flaky, attempts, start_ts, end_ts)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        build_id,
                        stage_id,
                        task.name,
                        task.status.as_str(),
                        task.flaky,
                        task.attempts,
                        task.start_ts,
                        task.end_ts
                    ],
                )
                .with_context(|| format!("Failed to create task '{}' in build {}", name, build_id))?;
                task
            }
        };

        if let Some(tx) = tx {
            tx.commit()?;
        }
        log::debug!("Task {}/{} in build {} is now {}", stage_name, name, build_id, task.status.as_str());
        Ok(task)
    }

    /// Get a task of a build by name
    pub fn get(conn: &Connection, build_id: i64, name: &str) -> Result<Option<Task>> {
        Ok(Self::get_with_id(conn, build_id, name)?.map(|(_, task)| task))
    }

    /// Flag or unflag a task name as flaky in every build. Returns rows changed.
    pub fn set_flaky(conn: &Connection, name: &str, flaky: bool) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE tasks SET flaky = ?1 WHERE name = ?2",
            rusqlite::params![flaky, name],
        )
        .with_context(|| format!("Failed to update flaky flag for task '{}'", name))?;
        Ok(changed)
    }

    fn get_with_id(conn: &Connection, build_id: i64, name: &str) -> Result<Option<(i64, Task)>> {
        let row = conn.query_row(
            "SELECT t.id, s.name, t.status, t.flaky, t.attempts, t.start_ts, t.end_ts
             FROM tasks t JOIN stages s ON s.id = t.stage_id
             WHERE t.build_id = ?1 AND t.name = ?2",
            rusqlite::params![build_id, name],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<i64>>(6)?,
                ))
            },
        ).optional()?;

        match row {
            Some((id, stage_name, status, flaky, attempts, start_ts, end_ts)) => {
                let status = TaskStatus::from_str(&status)
                    .with_context(|| format!("Unknown task status '{}' for task {}", status, id))?;
                Ok(Some((id, Task {
                    name: name.to_string(),
                    stage_name,
                    flaky,
                    status,
                    attempts,
                    start_ts,
                    end_ts,
                })))
            }
            None => Ok(None),
        }
    }
}

/// Update timing bookkeeping for a status change.
/// Restarting a finished task counts as a new attempt.
fn apply_transition(task: &mut Task, status: TaskStatus, now: i64) {
    match status {
        TaskStatus::InProgress => {
            if task.status.is_final() {
                task.attempts += 1;
                task.end_ts = None;
                task.start_ts = Some(now);
            } else if task.status != TaskStatus::InProgress {
                task.start_ts = Some(now);
            }
        }
        s if s.is_final() => {
            if !task.status.is_final() {
                task.end_ts = Some(now);
            }
        }
        _ => {}
    }
    task.status = status;
}
