use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version = Self::get_version(conn).unwrap_or(0);

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            log::debug!("Applied schema migration v{}", version);
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

type Migration = fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>;

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, Migration> {
    let mut migrations: HashMap<u32, Migration> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: builds, stages and tasks
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    // One row per recorded build (the build's checklist)
    tx.execute(
        "CREATE TABLE builds (
            id INTEGER PRIMARY KEY,
            uuid TEXT NOT NULL UNIQUE,
            commit_sha TEXT NOT NULL,
            branch TEXT NOT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_builds_created ON builds(created_ts DESC, id DESC)",
        [],
    )?;

    // Stages keep insertion order through position
    tx.execute(
        "CREATE TABLE stages (
            id INTEGER PRIMARY KEY,
            build_id INTEGER NOT NULL REFERENCES builds(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            UNIQUE(build_id, name)
        )",
        [],
    )?;

    // build_id is denormalised so task names can be unique per build, across stages
    tx.execute(
        "CREATE TABLE tasks (
            id INTEGER PRIMARY KEY,
            build_id INTEGER NOT NULL REFERENCES builds(id) ON DELETE CASCADE,
            stage_id INTEGER NOT NULL REFERENCES stages(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('new','in_progress','succeeded','failed','skipped')),
            flaky INTEGER NOT NULL DEFAULT 0,
            UNIQUE(build_id, name)
        )",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_tasks_stage_id ON tasks(stage_id)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX idx_tasks_name ON tasks(name)",
        [],
    )?;

    Ok(())
}

/// Migration v2: task attempt and timing bookkeeping
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute("ALTER TABLE tasks ADD COLUMN attempts INTEGER NOT NULL DEFAULT 1", [])?;
    tx.execute("ALTER TABLE tasks ADD COLUMN start_ts INTEGER NULL", [])?;
    tx.execute("ALTER TABLE tasks ADD COLUMN end_ts INTEGER NULL", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_migration_applies_cleanly() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();

        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_foreign_key_constraints() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON").unwrap();
        MigrationManager::initialize(&conn).unwrap();

        // Stage pointing at a build that does not exist
        let result = conn.execute(
            "INSERT INTO stages (build_id, name, position) VALUES (999, 'tests', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_task_name_unique_per_build() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO builds (uuid, commit_sha, branch, created_ts) VALUES ('u1', 'abc', 'main', 1000)",
            [],
        ).unwrap();
        let build_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO stages (build_id, name, position) VALUES (?1, 'build', 0), (?1, 'tests', 1)",
            [build_id],
        ).unwrap();

        conn.execute(
            "INSERT INTO tasks (build_id, stage_id, name, status)
             SELECT ?1, id, 'unit', 'new' FROM stages WHERE name = 'build'",
            [build_id],
        ).unwrap();

        // Same name in another stage of the same build is rejected
        let result = conn.execute(
            "INSERT INTO tasks (build_id, stage_id, name, status)
             SELECT ?1, id, 'unit', 'new' FROM stages WHERE name = 'tests'",
            [build_id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();

        conn.execute(
            "INSERT INTO builds (uuid, commit_sha, branch, created_ts) VALUES ('u1', 'abc', 'main', 1000)",
            [],
        ).unwrap();
        conn.execute(
            "INSERT INTO stages (build_id, name, position) VALUES (1, 'tests', 0)",
            [],
        ).unwrap();

        let result = conn.execute(
            "INSERT INTO tasks (build_id, stage_id, name, status) VALUES (1, 1, 'unit', 'exploded')",
            [],
        );
        assert!(result.is_err());
    }
}
