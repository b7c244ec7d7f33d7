//! Smoke tests for the scrollprobe CLI
//!
//! None of these launch a browser.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn scrollprobe() -> Command {
    Command::cargo_bin("scrollprobe").expect("scrollprobe binary should exist")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    scrollprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    scrollprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_no_args_fails() {
    scrollprobe().assert().failure();
}

#[test]
fn test_run_help_lists_options() {
    scrollprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--checkpoints"))
        .stdout(predicate::str::contains("--settle-ms"))
        .stdout(predicate::str::contains("--deadline-ms"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_run_without_browser_is_fatal() {
    scrollprobe()
        .args([
            "run",
            "--targets",
            "https://a.test",
            "--chromium-path",
            "/nonexistent/chromium",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Page driver unavailable"));
}

// ============================================================================
// Validate Tests
// ============================================================================

#[test]
fn test_validate_url_list() {
    scrollprobe()
        .args([
            "validate",
            "--targets",
            "https://a.test,https://b.test",
            "--actor",
            ".bird",
        ])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("targets: 2"))
        .stdout(predicate::str::contains("https://b.test"))
        .stdout(predicate::str::contains("actors: .bird"));
}

#[test]
fn test_validate_checkpoint_count() {
    scrollprobe()
        .args(["validate", "--targets", "https://a.test", "--checkpoints", "3"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("checkpoints: top, down500, top"));
}

#[test]
fn test_validate_targets_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("targets.yaml");
    fs::write(
        &path,
        "defaults:\n  marker: '#stage'\n  actors: ['.bird']\ntargets:\n  - https://a.test\n  - url: https://b.test\n    id: second\n    actors: ['.crow']\n",
    )
    .unwrap();

    scrollprobe()
        .args(["validate", "--targets"])
        .arg(&path)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("second -> https://b.test"))
        .stdout(predicate::str::contains("actors: .crow"))
        .stdout(predicate::str::contains("marker: #stage"));
}

#[test]
fn test_validate_json_format() {
    let output = scrollprobe()
        .args(["validate", "--targets", "https://a.test", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["targets"][0]["url"], "https://a.test");
    assert_eq!(value["config"]["settle_ms"], 750);
}

#[test]
fn test_validate_malformed_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("targets.yaml");
    fs::write(&path, "targets: [unclosed").unwrap();

    scrollprobe()
        .args(["validate", "--targets"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_validate_empty_targets_is_fatal() {
    scrollprobe()
        .args(["validate", "--targets", " , "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no targets"));
}

#[test]
fn test_validate_negative_margin_is_fatal() {
    scrollprobe()
        .args(["validate", "--targets", "https://a.test", "--margin-px=-1"])
        .assert()
        .code(2);
}
