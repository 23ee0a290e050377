//! Corruption recovery tests for the coach binary.
//!
//! These tests verify the system can handle:
//! - Corrupted program files
//! - Corrupted history lines
//! - Partial writes

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("coach"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_program_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(data_dir.join("programs.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted programs");

    cli()
        .arg("list")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No programs yet"));

    // Next save replaces the unreadable file
    cli()
        .args(["new", "--name", "Fresh"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    let contents = fs::read_to_string(data_dir.join("programs.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["programs"][0]["name"], "Fresh");
}

#[test]
fn test_corrupted_history_lines_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::write(
        data_dir.join("history.jsonl"),
        "{ invalid json }\n{ more invalid }",
    )
    .expect("Failed to write corrupted history");

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts"));
}

#[test]
fn test_partial_history_line() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Finish one workout so the log has a valid line
    cli()
        .args(["new", "--name", "Quick"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
    cli()
        .args(["add-phase", "Quick"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
    cli()
        .args(["add-exercise", "Quick", "1", "Jog", "--seconds", "5"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
    cli()
        .args(["play", "Quick", "--simulate"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    // Simulate a crash during the next append
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("history.jsonl"))
        .unwrap();
    write!(file, r#"{{"id":"00000000-0000-0000-0000-000000000000","program_id":"#).unwrap();
    drop(file);

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quick"))
        .stdout(predicate::str::contains("1/1 steps"));
}
