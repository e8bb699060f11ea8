//! Smoke tests for the authprobe CLI

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command for the authprobe binary, isolated from the caller's environment
fn authprobe(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("authprobe").expect("authprobe binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("BASE_URL")
        .env_remove("LOG_LEVEL")
        .env_remove("AUTHPROBE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn short_timeouts(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("harness.yaml");
    fs::write(&path, "default_timeout_ms: 2000\nnavigation_timeout_ms: 2000\n").unwrap();
    path
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_missing_subcommand_fails() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp).assert().failure();
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: https://opensource-demo.orangehrmlive.com"))
        .stdout(predicate::str::contains("default_timeout_ms: 30000"));
}

#[test]
fn test_config_overrides_layer() {
    let tmp = TempDir::new().unwrap();
    let file = short_timeouts(&tmp);
    authprobe(&tmp)
        .arg("config")
        .arg("--config")
        .arg(&file)
        .env("BASE_URL", "http://from-env:8080")
        .args(["--log-level", "debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://from-env:8080"))
        .stdout(predicate::str::contains("default_timeout_ms: 2000"))
        .stdout(predicate::str::contains("log_level: DEBUG"));
}

#[test]
fn test_config_rejects_bad_level() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["config", "--log-level", "loud"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid argument"));
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_canonical_table() {
    let tmp = TempDir::new().unwrap();
    let assert = authprobe(&tmp).arg("list").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    for id in ["TC001", "TC002", "TC003", "TC004", "TC005", "TC006", "TC007", "TC008"] {
        assert!(stdout.contains(id), "missing {id}");
    }
}

#[test]
fn test_list_positive_only() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["list", "--positive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TC001"))
        .stdout(predicate::str::contains("TC002").not());
}

#[test]
fn test_list_missing_data_file() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["list", "--data", "nope.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.json"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_requires_driver() {
    let tmp = TempDir::new().unwrap();
    if cfg!(feature = "browser") {
        return;
    }
    authprobe(&tmp)
        .args(["run", "--suite", "session"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--simulate"));
}

#[test]
fn test_run_simulated_session_suite() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["run", "--simulate", "--suite", "session", "--quiet"])
        .assert()
        .success();
    let results = tmp.path().join("test-results");
    let json = fs::read_to_string(results.join("results.json")).unwrap();
    assert!(json.contains("TC010 - Verify Login Session"));
    assert!(results.join("junit.xml").exists());
}

#[test]
fn test_run_only_unknown_id() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["run", "--simulate", "--only", "TC999"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("TC999"));
}

#[test]
fn test_run_skip_is_reported() {
    let tmp = TempDir::new().unwrap();
    authprobe(&tmp)
        .args(["run", "--simulate", "--only", "TC001", "--skip", "TC001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIP"))
        .stdout(predicate::str::contains("0 passed, 0 failed, 1 skipped"));
}

#[test]
fn test_run_failing_row_exits_one() {
    let tmp = TempDir::new().unwrap();
    let config = short_timeouts(&tmp);
    let data = tmp.path().join("rows.json");
    fs::write(
        &data,
        r#"[{
            "testId": "TC100",
            "testName": "Wrong password marked as valid",
            "username": "Admin",
            "password": "not-the-password",
            "expectedResult": "Login should succeed",
            "shouldSucceed": true
        }]"#,
    )
    .unwrap();

    authprobe(&tmp)
        .arg("run")
        .arg("--simulate")
        .arg("--config")
        .arg(&config)
        .arg("--data")
        .arg(&data)
        .args(["--retries", "0"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("TC100 - Wrong password marked as valid"));

    let shots: Vec<_> = fs::read_dir(tmp.path().join("screenshots"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(shots.len(), 1);
    assert!(shots[0].starts_with("TC100_-_Wrong_password_marked_as_valid_"));
}
