//! Concurrency tests for doselog.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the same data file simultaneously (file locking)
//! - Read while others write

use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;
use std::thread;
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

fn enrolled(temp_dir: &TempDir, days: &str) -> String {
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
            "--days",
            days,
        ],
    );
    enrollment["id"].as_str().unwrap().to_string()
}

#[test]
fn test_concurrent_takes_all_recorded() {
    let temp_dir = setup_test_dir();
    let enrollment = enrolled(&temp_dir, "8");

    let logs = json(&temp_dir, &["logs", &enrollment]);
    let doses: Vec<String> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(doses.len(), 8);

    thread::scope(|scope| {
        for dose in &doses {
            let temp_dir = &temp_dir;
            scope.spawn(move || {
                cli(temp_dir).args(["take", dose]).assert().success();
            });
        }
    });

    let stats = json(&temp_dir, &["stats", &enrollment]);
    assert_eq!(stats["used_pills"], 8.0);

    let content = std::fs::read_to_string(data_dir(&temp_dir).join("dose_logs.jsonl")).unwrap();
    for line in content.lines() {
        serde_json::from_str::<Value>(line).expect("interleaved write");
    }
    assert_eq!(content.lines().count(), 16);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_test_dir();
    let enrollment = enrolled(&temp_dir, "6");

    let logs = json(&temp_dir, &["logs", &enrollment]);
    let doses: Vec<String> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect();

    thread::scope(|scope| {
        for dose in &doses {
            let temp_dir = &temp_dir;
            scope.spawn(move || {
                cli(temp_dir).args(["take", dose]).assert().success();
            });
        }
        for _ in 0..4 {
            let temp_dir = &temp_dir;
            let enrollment = &enrollment;
            scope.spawn(move || {
                let logs = json(temp_dir, &["logs", enrollment]);
                assert_eq!(logs.as_array().unwrap().len(), 6);
            });
        }
    });

    let stats = json(&temp_dir, &["stats", &enrollment]);
    assert_eq!(stats["used_pills"], 6.0);
}
