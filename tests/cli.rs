//! Integration tests for the non-interactive commands.

use rusty_leveldb::{Options, DB};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Create a database holding a text and a binary value
fn create_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("db");
    let mut db = DB::open(
        &path,
        Options {
            create_if_missing: true,
            ..Options::default()
        },
    )
    .expect("Failed to create database");
    db.put(b"a", b"1").unwrap();
    db.put(b"b", &[0xFF, 0xFE]).unwrap();
    db.put(b"user:alice", b"Admin").unwrap();
    db.flush().unwrap();
    path
}

/// Run ldbview with given args, returning (stdout, stderr, success)
fn run_ldbview(args: &[&str], data_home: &Path) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_ldbview"))
        .args(args)
        .env("NO_COLOR", "1")
        .env("XDG_DATA_HOME", data_home)
        .env("HOME", data_home)
        .output()
        .expect("Failed to run ldbview");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_dump_text() {
    let dir = TempDir::new().unwrap();
    let db = create_fixture(&dir);

    let (out, _, ok) = run_ldbview(&["dump", db.to_str().unwrap(), "--no-color"], dir.path());
    assert!(ok);
    assert_eq!(out, "a = 1\nb = [Binary: 2 bytes]\nuser:alice = Admin\n");
}

#[test]
fn test_dump_filtered_hex() {
    let dir = TempDir::new().unwrap();
    let db = create_fixture(&dir);

    let (out, _, ok) = run_ldbview(
        &["dump", db.to_str().unwrap(), "--hex", "-q", "ff"],
        dir.path(),
    );
    assert!(ok);
    assert_eq!(out, "62 = FF FE\n");
}

#[test]
fn test_dump_json_lines() {
    let dir = TempDir::new().unwrap();
    let db = create_fixture(&dir);

    let (out, _, ok) = run_ldbview(&["dump", db.to_str().unwrap(), "--json", "-n", "2"], dir.path());
    assert!(ok);

    let lines: Vec<serde_json::Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["key"], "b");
    assert_eq!(lines[1]["value_binary"], true);
}

#[test]
fn test_count_with_query() {
    let dir = TempDir::new().unwrap();
    let db = create_fixture(&dir);

    let (out, _, ok) = run_ldbview(&["count", db.to_str().unwrap(), "-q", "ADMIN"], dir.path());
    assert!(ok);
    assert_eq!(out.trim(), "1 of 3 entries match");

    let (out, _, ok) = run_ldbview(&["count", db.to_str().unwrap()], dir.path());
    assert!(ok);
    assert_eq!(out.trim(), "3 entries");
}

#[test]
fn test_missing_database_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let (_, err, ok) = run_ldbview(&["count", missing.to_str().unwrap()], dir.path());
    assert!(!ok);
    assert!(err.contains("Database not found"), "stderr: {}", err);
}

#[test]
fn test_repair_verify() {
    let dir = TempDir::new().unwrap();
    let db = create_fixture(&dir);

    let (out, _, ok) = run_ldbview(&["repair", db.to_str().unwrap(), "--verify"], dir.path());
    assert!(ok);
    assert!(out.contains("Repaired"));
    assert!(out.contains("3 entries readable"));
}

#[test]
fn test_config_shows_defaults() {
    let dir = TempDir::new().unwrap();

    let (out, _, ok) = run_ldbview(&["config"], dir.path());
    assert!(ok);
    assert!(out.contains("\"debounce_ms\": 300"));

    let (out, _, ok) = run_ldbview(&["config", "--debounce-ms", "50"], dir.path());
    assert!(ok);
    assert!(out.contains("\"debounce_ms\": 50"));
}
