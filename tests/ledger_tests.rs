// Recording builds and reading them back through the CLI

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::fs;
use trendline::db::DbConnection;
use trendline::models::TaskStatus;
use trendline::repo::{BuildRepo, TaskRepo};

fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_home_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let config_dir = temp_dir.path().join(".trendline");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("rc"), format!("data.location={}\n", db_path.display())).unwrap();
    (temp_dir, guard)
}

fn get_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("trendline").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd
}

fn open_db(temp_dir: &TempDir) -> rusqlite::Connection {
    DbConnection::connect_at(&temp_dir.path().join("test.db")).unwrap()
}

#[test]
fn test_record_build_with_tasks() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["record", "abc123", "--branch", "release", "build:compile=succeeded", "tests:unit", "tests:e2e=failed+flaky"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded build 1 (abc123)"));

    let conn = open_db(&temp_dir);
    let build = BuildRepo::get_by_id(&conn, 1).unwrap().unwrap();
    assert_eq!(build.branch, "release");
    assert_eq!(build.stages.len(), 2);
    assert_eq!(build.stages[0].name, "build");
    assert_eq!(build.stages[1].tasks.len(), 2);

    let unit = TaskRepo::get(&conn, 1, "unit").unwrap().unwrap();
    assert_eq!(unit.status, TaskStatus::New);
    let e2e = TaskRepo::get(&conn, 1, "e2e").unwrap().unwrap();
    assert!(e2e.flaky);
    assert_eq!(e2e.status, TaskStatus::Failed);
}

#[test]
fn test_record_rejects_duplicate_task_names() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["record", "abc123", "build:unit", "tests:unit"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("listed more than once"));
}

#[test]
fn test_record_rejects_bad_spec() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["record", "abc123", "tests:unit=faild"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Did you mean 'failed'?"));

    get_cmd(&temp_dir)
        .args(&["record", "abc123", "unit"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Expected stage:name"));
}

#[test]
fn test_task_updates_latest_build_by_default() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit"]).assert().success();
    get_cmd(&temp_dir).args(&["record", "c2", "tests:unit"]).assert().success();

    get_cmd(&temp_dir)
        .args(&["task", "tests:unit=in_progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build 2: tests:unit is in_progress"));

    get_cmd(&temp_dir)
        .args(&["task", "tests:unit=succeeded", "--build", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build 1: tests:unit is succeeded"));

    let conn = open_db(&temp_dir);
    assert_eq!(TaskRepo::get(&conn, 1, "unit").unwrap().unwrap().status, TaskStatus::Succeeded);
    assert_eq!(TaskRepo::get(&conn, 2, "unit").unwrap().unwrap().status, TaskStatus::InProgress);
}

#[test]
fn test_task_adds_new_stage() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit"]).assert().success();

    get_cmd(&temp_dir)
        .args(&["task", "deploy:publish=skipped+flaky"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy:publish is skipped (flaky)"));

    let conn = open_db(&temp_dir);
    let build = BuildRepo::get_by_id(&conn, 1).unwrap().unwrap();
    assert_eq!(build.stages.len(), 2);
    assert_eq!(build.stages[1].name, "deploy");
}

#[test]
fn test_task_cannot_move_stage() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit"]).assert().success();

    get_cmd(&temp_dir)
        .args(&["task", "deploy:unit=failed"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already belongs to stage 'tests'"));
}

#[test]
fn test_task_requires_status() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit"]).assert().success();

    get_cmd(&temp_dir)
        .args(&["task", "tests:unit"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Missing status"));
}

#[test]
fn test_task_without_builds() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["task", "tests:unit=failed"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No builds recorded"));
}

#[test]
fn test_flaky_toggle() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit=failed"]).assert().success();
    get_cmd(&temp_dir).args(&["record", "c2", "tests:unit=failed"]).assert().success();

    get_cmd(&temp_dir)
        .args(&["flaky", "unit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked task 'unit' as flaky in 2 builds"));

    get_cmd(&temp_dir)
        .args(&["flaky", "unit", "--off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("as not flaky"));

    get_cmd(&temp_dir)
        .args(&["flaky", "missing"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not found in any build"));
}

#[test]
fn test_builds_list_newest_first() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "first", "tests:unit=succeeded"]).assert().success();
    get_cmd(&temp_dir).args(&["record", "second", "tests:unit=failed"]).assert().success();

    let output = get_cmd(&temp_dir)
        .args(&["builds"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let second = stdout.find("second").unwrap();
    let first = stdout.find("first").unwrap();
    assert!(second < first, "newest build should be listed first:\n{}", stdout);

    get_cmd(&temp_dir)
        .args(&["builds", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("second"))
        .stdout(predicate::str::contains("first").not());
}

#[test]
fn test_builds_json() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir).args(&["record", "c1", "tests:unit=succeeded"]).assert().success();

    let output = get_cmd(&temp_dir)
        .args(&["builds", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let builds: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(builds.as_array().unwrap().len(), 1);
    assert_eq!(builds[0]["commit"], "c1");
    assert_eq!(builds[0]["stages"][0]["tasks"][0]["task"]["status"], "Succeeded");
}

#[test]
fn test_builds_empty() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["builds"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No builds recorded."));
}

#[test]
fn test_show_build() {
    let (temp_dir, _guard) = setup_test_env();
    get_cmd(&temp_dir)
        .args(&["record", "abc123", "build:compile=succeeded", "tests:e2e=failed+flaky"])
        .assert()
        .success();

    get_cmd(&temp_dir)
        .args(&["show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build 1: main@abc123"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("e2e [flaky]"));
}

#[test]
fn test_show_missing_build() {
    let (temp_dir, _guard) = setup_test_env();

    get_cmd(&temp_dir)
        .args(&["show", "7"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Build 7 not found"));
}
