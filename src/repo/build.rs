use rusqlite::{Connection, OptionalExtension};
use crate::models::{BuildStatus, Stage, Task, TaskEntry, TaskStatus};
use anyhow::{Context, Result};

/// Build repository: records builds and reads them back fully materialised
pub struct BuildRepo;

/// Raw stage/task join row, converted to models after the query completes
struct StageTaskRow {
    stage_id: i64,
    stage_name: String,
    task_id: Option<i64>,
    task_name: Option<String>,
    status: Option<String>,
    flaky: Option<bool>,
    attempts: Option<i64>,
    start_ts: Option<i64>,
    end_ts: Option<i64>,
}

impl BuildRepo {
    /// Record a new build with no stages
    pub fn create(conn: &Connection, commit: &str, branch: &str) -> Result<BuildStatus> {
        let build = BuildStatus::new(commit, branch);

        conn.execute(
            "INSERT INTO builds (uuid, commit_sha, branch, created_ts) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![build.uuid, build.commit, build.branch, build.created_ts],
        )
        .with_context(|| format!("Failed to create build for commit {}", commit))?;

        let id = conn.last_insert_rowid();
        log::debug!("Recorded build {} for {}@{}", id, branch, commit);

        Ok(BuildStatus {
            id: Some(id),
            ..build
        })
    }

    /// Get the id of a stage in a build, creating it at the end if needed
    pub fn add_stage(conn: &Connection, build_id: i64, name: &str) -> Result<i64> {
        let existing: Option<i64> = conn.query_row(
            "SELECT id FROM stages WHERE build_id = ?1 AND name = ?2",
            rusqlite::params![build_id, name],
            |row| row.get(0),
        ).optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO stages (build_id, name, position)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM stages WHERE build_id = ?1))",
            rusqlite::params![build_id, name],
        )
        .with_context(|| format!("Failed to add stage '{}' to build {}", name, build_id))?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a build by id with all stages and tasks
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<BuildStatus>> {
        let mut stmt = conn.prepare(
            "SELECT id, uuid, commit_sha, branch, created_ts FROM builds WHERE id = ?1"
        )?;
        let build = stmt.query_row([id], Self::row_to_build).optional()?;

        match build {
            Some(mut build) => {
                build.stages = Self::load_stages(conn, id)?;
                Ok(Some(build))
            }
            None => Ok(None),
        }
    }

    /// Most recent builds, newest first
    pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<BuildStatus>> {
        let mut stmt = conn.prepare(
            "SELECT id, uuid, commit_sha, branch, created_ts FROM builds
             ORDER BY created_ts DESC, id DESC
             LIMIT ?1"
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], Self::row_to_build)?;

        let mut builds = Vec::new();
        for row in rows {
            let mut build = row?;
            if let Some(id) = build.id {
                build.stages = Self::load_stages(conn, id)?;
            }
            builds.push(build);
        }
        Ok(builds)
    }

    /// Id of the most recently recorded build
    pub fn latest_id(conn: &Connection) -> Result<Option<i64>> {
        let id = conn.query_row(
            "SELECT id FROM builds ORDER BY created_ts DESC, id DESC LIMIT 1",
            [],
            |row| row.get(0),
        ).optional()?;
        Ok(id)
    }

    fn row_to_build(row: &rusqlite::Row) -> rusqlite::Result<BuildStatus> {
        Ok(BuildStatus {
            id: Some(row.get(0)?),
            uuid: row.get(1)?,
            commit: row.get(2)?,
            branch: row.get(3)?,
            created_ts: row.get(4)?,
            stages: Vec::new(),
        })
    }

    /// Load stages in position order, each with its tasks in insertion order
    fn load_stages(conn: &Connection, build_id: i64) -> Result<Vec<Stage>> {
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, t.id, t.name, t.status, t.flaky, t.attempts, t.start_ts, t.end_ts
             FROM stages s
             LEFT JOIN tasks t ON t.stage_id = s.id
             WHERE s.build_id = ?1
             ORDER BY s.position, t.id"
        )?;

        let rows = stmt.query_map([build_id], |row| {
            Ok(StageTaskRow {
                stage_id: row.get(0)?,
                stage_name: row.get(1)?,
                task_id: row.get(2)?,
                task_name: row.get(3)?,
                status: row.get(4)?,
                flaky: row.get(5)?,
                attempts: row.get(6)?,
                start_ts: row.get(7)?,
                end_ts: row.get(8)?,
            })
        })?;

        let mut stages: Vec<Stage> = Vec::new();
        for row in rows {
            let row = row?;
            if stages.last().and_then(|s| s.id) != Some(row.stage_id) {
                stages.push(Stage {
                    id: Some(row.stage_id),
                    name: row.stage_name.clone(),
                    tasks: Vec::new(),
                });
            }

            // LEFT JOIN yields a task-less row for empty stages
            let (Some(task_id), Some(name), Some(status)) = (row.task_id, row.task_name, row.status) else {
                continue;
            };
            let status = TaskStatus::from_str(&status)
                .with_context(|| format!("Unknown task status '{}' for task {}", status, task_id))?;

            if let Some(stage) = stages.last_mut() {
                stage.tasks.push(TaskEntry {
                    key: Some(task_id),
                    task: Task {
                        name,
                        stage_name: row.stage_name,
                        flaky: row.flaky.unwrap_or(false),
                        status,
                        attempts: row.attempts.unwrap_or(1),
                        start_ts: row.start_ts,
                        end_ts: row.end_ts,
                    },
                });
            }
        }
        Ok(stages)
    }
}
