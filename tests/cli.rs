//! End-to-end CLI tests with an isolated data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Nothing listens on port 1, so every send fails fast.
const UNREACHABLE: &str = "http://127.0.0.1:1";

fn repsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("repsync").unwrap();
    cmd.env("REPSYNC_HOME", home.path())
        .env("REPSYNC_SERVER", UNREACHABLE)
        .env_remove("REPSYNC_TOKEN")
        .env_remove("REPSYNC_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn help_describes_offline_logging() {
    let home = TempDir::new().unwrap();
    repsync(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("offline"));
}

#[test]
fn log_while_offline_queues_the_workout() {
    let home = TempDir::new().unwrap();

    repsync(&home)
        .args(["log", "pushups", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved offline"));

    repsync(&home)
        .args(["status", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending\": 1"));

    repsync(&home)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20 pushups"))
        .stdout(predicate::str::contains("queued just now"));

    repsync(&home)
        .args(["prompt", "--format", "labeled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unsynced:1"));

    assert!(home.path().join("sync-requested").exists());
}

#[test]
fn sync_while_offline_keeps_the_queue() {
    let home = TempDir::new().unwrap();
    repsync(&home).args(["log", "squats", "15", "--sets", "3"]).assert().success();

    repsync(&home)
        .args(["sync", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"remaining\": 1"))
        .stdout(predicate::str::contains("\"reason\": \"transient\""));

    repsync(&home)
        .args(["list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attempts\": 1"));
}

#[test]
fn empty_queue_prompt_prints_nothing() {
    let home = TempDir::new().unwrap();
    repsync(&home)
        .arg("prompt")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn config_init_and_path() {
    let home = TempDir::new().unwrap();

    repsync(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.yaml"));

    repsync(&home).args(["config", "init"]).assert().success();
    assert!(home.path().join("config.yaml").exists());

    repsync(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    repsync(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_queue_size: 1000"));
}

#[test]
fn invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "sync: [not, a, map]").unwrap();

    repsync(&home)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn completions_generate() {
    let home = TempDir::new().unwrap();
    repsync(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("repsync"));
}

#[test]
fn full_queue_reports_not_saved() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.yaml"),
        "sync:\n  max_queue_size: 1\n",
    )
    .unwrap();

    repsync(&home).args(["log", "pushups", "20"]).assert().success();
    repsync(&home)
        .args(["log", "pushups", "25"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not saved"));
}
