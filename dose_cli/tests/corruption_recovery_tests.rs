//! Corruption recovery tests for doselog.
//!
//! These tests verify the system can handle:
//! - Unreadable lines in the data files
//! - Partial writes (a truncated last line)
//! - Missing files

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Write as IoWrite;
use std::path::PathBuf;
use tempfile::TempDir;

fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("doselog"));
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir(temp_dir));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn data_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("data")
}

fn json(temp_dir: &TempDir, args: &[&str]) -> Value {
    let output = cli(temp_dir)
        .arg("--json")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("stdout is not JSON")
}

/// Creates a user, a medication and a 3-day twice-daily enrollment
fn enrolled(temp_dir: &TempDir) -> String {
    let user = json(temp_dir, &["user", "add", "patient@example.com"]);
    let med = json(
        temp_dir,
        &[
            "med",
            "add",
            "--name",
            "Amlodipine",
            "--strength-mg",
            "5",
            "--pills-per-box",
            "30",
        ],
    );
    let enrollment = json(
        temp_dir,
        &[
            "enroll",
            "--user",
            user["id"].as_str().unwrap(),
            "--medication",
            med["id"].as_str().unwrap(),
            "--boxes",
            "1",
            "--schedule",
            "morning:1",
            "--schedule",
            "evening:1",
            "--days",
            "3",
        ],
    );
    enrollment["id"].as_str().unwrap().to_string()
}

fn append_raw(path: &PathBuf, text: &str) {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("Failed to open data file");
    file.write_all(text.as_bytes()).unwrap();
}

#[test]
fn test_missing_data_dir_reads_as_empty() {
    let temp_dir = setup_test_dir();

    let meds = json(&temp_dir, &["med", "list"]);
    assert!(meds.as_array().unwrap().is_empty());

    cli(&temp_dir)
        .args(["user", "show", "nobody@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User not found"));
}

#[test]
fn test_corrupt_dose_log_line_skipped() {
    let temp_dir = setup_test_dir();
    let enrollment = enrolled(&temp_dir);

    let log_path = data_dir(&temp_dir).join("dose_logs.jsonl");
    append_raw(&log_path, "{ invalid json }\n");

    let logs = json(&temp_dir, &["logs", &enrollment]);
    assert_eq!(logs.as_array().unwrap().len(), 6);

    cli(&temp_dir)
        .args(["stats", &enrollment])
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipping unreadable DoseLog"));
}

#[test]
fn test_truncated_update_keeps_previous_version() {
    let temp_dir = setup_test_dir();
    let enrollment = enrolled(&temp_dir);

    let logs = json(&temp_dir, &["logs", &enrollment]);
    let dose = logs[0]["id"].as_str().unwrap().to_string();

    // A crash mid-append leaves a partial line behind.
    let log_path = data_dir(&temp_dir).join("dose_logs.jsonl");
    append_raw(
        &log_path,
        &format!("{{\"id\":\"{}\",\"enrollment_id\":\"{}\",\"ta", dose, enrollment),
    );

    let log = json(&temp_dir, &["logs", &enrollment]);
    let entry = log
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["id"] == dose.as_str())
        .unwrap()
        .clone();
    assert_eq!(entry["taken"], false);
}

#[test]
fn test_writes_continue_after_corrupt_line() {
    let temp_dir = setup_test_dir();
    let enrollment = enrolled(&temp_dir);

    let log_path = data_dir(&temp_dir).join("dose_logs.jsonl");
    append_raw(&log_path, "not json at all\n");

    let logs = json(&temp_dir, &["logs", &enrollment]);
    let dose = logs[0]["id"].as_str().unwrap().to_string();
    json(&temp_dir, &["take", &dose]);

    let stats = json(&temp_dir, &["stats", &enrollment]);
    assert_eq!(stats["used_pills"], 1.0);
}
