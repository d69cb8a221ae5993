//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Anything
//! needing real credentials or a live provider is out of scope here.

use std::process::Command;

fn run_cli(args: &[&str]) -> (String, String, i32) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let output = Command::new("cargo")
        .args(["run", "-p", "liftlog-cli", "--"])
        .args(args)
        // Isolate from the developer's real config and keyring-adjacent state.
        .env("HOME", dir.path())
        .env("LIFTLOG_ENV", "dev")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn help_lists_the_subcommands() {
    let (stdout, _, code) = run_cli(&["--help"]);
    assert_eq!(code, 0);
    for subcommand in ["auth", "sync", "events", "config"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn version_flag_reports_a_version() {
    let (stdout, _, code) = run_cli(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("liftlog"));
}

#[test]
fn unknown_subcommand_fails() {
    let (_, _, code) = run_cli(&["frobnicate"]);
    assert_ne!(code, 0);
}

#[test]
fn sync_run_with_a_missing_file_fails_cleanly() {
    let (_, stderr, code) = run_cli(&["sync", "run", "--file", "/nonexistent/workout.json"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("cannot read"));
}

#[test]
fn config_show_prints_the_defaults() {
    let (stdout, _, code) = run_cli(&["config", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("[calendar]"));
    assert!(stdout.contains("color_id"));
}

#[test]
fn set_color_rejects_values_outside_the_palette() {
    let (_, stderr, code) = run_cli(&["config", "set-color", "42"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("palette"));
}
