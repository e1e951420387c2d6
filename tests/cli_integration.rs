//! Integration tests for the `twig` CLI.
//!
//! Each test works in a temp directory, runs `twig` as a subprocess, and
//! checks stdout and/or the list file on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Path to the built `twig` binary.
fn twig_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_twig"))
}

/// Run `twig` with the given args in the given directory, returning (stdout, stderr, success).
///
/// The config path points into `dir` so the user's own config is never read.
fn run_twig(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(twig_bin())
        .args(args)
        .current_dir(dir)
        .env("TWIG_CONFIG", dir.join("config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("TWIG_LOG")
        .output()
        .expect("failed to run twig");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `twig` expecting success, return stdout.
fn run_twig_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_twig(dir, args);
    if !success {
        panic!(
            "twig {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `twig` expecting failure, return stderr.
fn run_twig_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_twig(dir, args);
    if success {
        panic!("twig {:?} should have failed:\nstdout: {}", args, stdout);
    }
    stderr
}

/// do A, do B, do C
fn abc(dir: &Path) {
    for text in ["do A", "do B", "do C"] {
        run_twig_ok(dir, &["add", text]);
    }
}

fn list_json(dir: &Path) -> serde_json::Value {
    let text = fs::read_to_string(dir.join(".twig")).unwrap();
    serde_json::from_str(&text).unwrap()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_view_empty_directory() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_twig_ok(tmp.path(), &[]);
    assert_eq!(out, "");
    assert!(!tmp.path().join(".twig").exists());
}

#[test]
fn test_add_and_view() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    let out = run_twig_ok(tmp.path(), &[]);
    assert_eq!(out, "  1. do A\n  2. do B\n  3. do C\n");
    let out = run_twig_ok(tmp.path(), &["view", "--order", "-index"]);
    assert_eq!(out, "  3. do C\n  2. do B\n  1. do A\n");
}

#[test]
fn test_view_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());
    run_twig_ok(tmp.path(), &["add", "-g", "2", "do", "B.A"]);

    let out = run_twig_ok(tmp.path(), &["--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let tasks = parsed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[1]["subtasks"][0]["index"], "2.1");
    assert_eq!(tasks[1]["subtasks"][0]["text"], "do B.A");
}

#[test]
fn test_info() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());
    run_twig_ok(tmp.path(), &["add", "-p", "high", "-g", "1", "do A.A"]);

    let out = run_twig_ok(tmp.path(), &["info", "1.1"]);
    assert!(out.contains("index:     1.1"));
    assert!(out.contains("text:      do A.A"));
    assert!(out.contains("priority:  high"));
    assert!(out.contains("completed: no"));

    let out = run_twig_ok(tmp.path(), &["info", "1", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["subtask_count"], 1);
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

#[test]
fn test_add_with_graft_prints_index() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    let out = run_twig_ok(tmp.path(), &["add", "-g", "1", "do", "A.A"]);
    assert_eq!(out.trim(), "added 1.1");
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"][0]["subtasks"][0]["text"], "do A.A");
}

#[test]
fn test_done_hides_until_all() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["done", "2"]);
    let out = run_twig_ok(tmp.path(), &[]);
    assert_eq!(out, "  1. do A\n  3. do C\n");

    let out = run_twig_ok(tmp.path(), &["-A", "--order", "index"]);
    assert_eq!(out, "  1. do A\n  2. do B ✓\n  3. do C\n");

    run_twig_ok(tmp.path(), &["undone", "2"]);
    let out = run_twig_ok(tmp.path(), &[]);
    assert!(out.contains("2. do B\n"));
}

#[test]
fn test_edit_text_and_priority() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["edit", "-p", "veryhigh", "3", "do", "C", "first"]);
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"][2]["text"], "do C first");
    assert_eq!(json["tasks"][2]["priority"], "veryhigh");

    // Default order is by priority
    let out = run_twig_ok(tmp.path(), &[]);
    assert!(out.starts_with("  3. do C first\n"));
}

#[test]
fn test_remove_range() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    let out = run_twig_ok(tmp.path(), &["rm", "1-2"]);
    assert_eq!(out.trim(), "removed 2 tasks");
    assert_eq!(run_twig_ok(tmp.path(), &[]), "  1. do C\n");
}

#[test]
fn test_move_and_back() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["mv", "3", "1"]);
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"][0]["subtasks"][0]["text"], "do C");

    run_twig_ok(tmp.path(), &["mv", "1.1"]);
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"][2]["text"], "do C");
}

#[test]
fn test_title() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["title", "Weekend", "jobs"]);
    let out = run_twig_ok(tmp.path(), &[]);
    assert!(out.starts_with("Weekend jobs\n\n  1. do A\n"));
}

#[test]
fn test_purge_negative_age() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["done", "2"]);
    run_twig_ok(tmp.path(), &["purge", "-2s"]);
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_purge_keeps_recent() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());

    run_twig_ok(tmp.path(), &["done", "2"]);
    run_twig_ok(tmp.path(), &["purge", "7d"]);
    let json = list_json(tmp.path());
    assert_eq!(json["tasks"].as_array().unwrap().len(), 3);
}

#[test]
fn test_import_todo_comments() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("main.rs"),
        "// TODO: parse flags\nfn main() {}\n// FIXME: exit code\n",
    )
    .unwrap();

    let out = run_twig_ok(tmp.path(), &["import", "main.rs"]);
    assert!(out.contains("2 added"));
    let out = run_twig_ok(tmp.path(), &["--order", "index"]);
    assert_eq!(out, "  1. main.rs\n      1. parse flags\n      2. exit code\n");

    fs::write(tmp.path().join("main.rs"), "// FIXME: exit code\n").unwrap();
    let out = run_twig_ok(tmp.path(), &["import", "main.rs"]);
    assert!(out.contains("1 completed"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn test_errors_leave_file_untouched() {
    let tmp = tempfile::TempDir::new().unwrap();
    abc(tmp.path());
    let before = fs::read_to_string(tmp.path().join(".twig")).unwrap();

    let err = run_twig_err(tmp.path(), &["add"]);
    assert!(err.contains("error: expected text for new task"));

    let err = run_twig_err(tmp.path(), &["add", "-g", "9", "orphan"]);
    assert!(err.contains("invalid graft target 9"));

    let err = run_twig_err(tmp.path(), &["done", "1", "7"]);
    assert!(err.contains("invalid task index 7"));

    let err = run_twig_err(tmp.path(), &["rm", "3-1"]);
    assert!(err.contains("no tasks matched"));

    let err = run_twig_err(tmp.path(), &["rm", "1-x"]);
    assert!(err.contains("invalid task range 1-x"));

    let err = run_twig_err(tmp.path(), &["rm"]);
    assert!(err.contains("no tasks given"));

    let err = run_twig_err(tmp.path(), &["mv", "1", "1"]);
    assert!(err.contains("cannot move task 1 below itself"));

    let err = run_twig_err(tmp.path(), &["add", "-p", "urgent", "x"]);
    assert!(err.contains("unknown priority"));

    let err = run_twig_err(tmp.path(), &["purge", "soon"]);
    assert!(err.contains("invalid duration"));

    let err = run_twig_err(tmp.path(), &["rm", "1-18446744073709551615"]);
    assert!(err.contains("error: invalid task index 4"), "{}", err);

    for age in ["3000000000h", "-3000000000h"] {
        let err = run_twig_err(tmp.path(), &["purge", age]);
        assert!(err.contains("error: purge age"), "{}", err);
        assert!(err.contains("out of range"), "{}", err);
    }

    assert_eq!(fs::read_to_string(tmp.path().join(".twig")).unwrap(), before);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn test_second_save_writes_backup() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_twig_ok(tmp.path(), &["add", "first"]);
    assert!(!tmp.path().join(".twig~").exists());

    run_twig_ok(tmp.path(), &["add", "second"]);
    let backup = fs::read_to_string(tmp.path().join(".twig~")).unwrap();
    assert!(backup.contains("first"));
    assert!(!backup.contains("second"));
}

#[test]
fn test_backup_recovers_missing_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_twig_ok(tmp.path(), &["add", "first"]);
    run_twig_ok(tmp.path(), &["add", "second"]);
    fs::remove_file(tmp.path().join(".twig")).unwrap();

    assert_eq!(run_twig_ok(tmp.path(), &[]), "  1. first\n");
}

#[test]
fn test_legacy_file_fallback() {
    let tmp = tempfile::TempDir::new().unwrap();
    let legacy = "# Old list\n\n- [ ] (high) from legacy\n  - created: 1316944980\n";
    fs::write(tmp.path().join(".todo"), legacy).unwrap();

    let out = run_twig_ok(tmp.path(), &[]);
    assert_eq!(out, "Old list\n\n  1. from legacy\n");

    run_twig_ok(tmp.path(), &["add", "new"]);
    let json = list_json(tmp.path());
    assert_eq!(json["title"], "Old list");
    assert_eq!(json["tasks"][0]["priority"], "high");
    assert_eq!(fs::read_to_string(tmp.path().join(".todo")).unwrap(), legacy);
}

#[test]
fn test_corrupt_file_starts_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join(".twig"), "{ not json").unwrap();

    let (stdout, stderr, success) = run_twig(tmp.path(), &[]);
    assert!(success);
    assert_eq!(stdout, "");
    assert!(stderr.contains("skipping unreadable list file"));
}

#[test]
fn test_file_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_twig_ok(tmp.path(), &["--file", "tasks.json", "add", "elsewhere"]);
    assert!(tmp.path().join("tasks.json").exists());
    assert!(!tmp.path().join(".twig").exists());
    let out = run_twig_ok(tmp.path(), &["--file", "tasks.json"]);
    assert_eq!(out, "  1. elsewhere\n");
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn test_config_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "file = \"list.json\"\npriority = \"low\"\nshow_all = true\n",
    )
    .unwrap();

    run_twig_ok(tmp.path(), &["add", "configured"]);
    run_twig_ok(tmp.path(), &["done", "1"]);
    let text = fs::read_to_string(tmp.path().join("list.json")).unwrap();
    assert!(text.contains("\"priority\": \"low\""));

    let out = run_twig_ok(tmp.path(), &[]);
    assert_eq!(out, "  1. configured ✓\n");
}

#[test]
fn test_malformed_config_is_fatal() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "file = [").unwrap();
    let err = run_twig_err(tmp.path(), &["add", "x"]);
    assert!(err.contains("could not parse"));
}

#[test]
fn test_man_page() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_twig_ok(tmp.path(), &["man"]);
    assert!(out.starts_with(".TH TWIG 1"));
    assert!(out.contains("\\fBpurge\\fR"));
}
