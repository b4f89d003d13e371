//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::Write;
use std::process::{Command, Stdio};

use chrono::Local;
use tempfile::TempDir;
use viewbudget_core::storage::ledger::{RESET_MARKER_KEY, USAGE_KEY};
use viewbudget_core::{day_key, Database};

const YOUTUBE: &str = "https://www.youtube.com/watch?v=abc";

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &TempDir, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(home, args, "")
}

fn run_cli_with_input(home: &TempDir, args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_viewbudget"))
        .args(args)
        .env("VIEWBUDGET_HOME", home.path())
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

/// Store 50 minutes of usage for today with a reset marker from an earlier
/// day, and move the reset boundary to midnight so it has always passed.
fn seed_unreset_usage(home: &TempDir) {
    let _ = run_cli(home, &["config", "set", "reset.hour", "0"]);
    let _ = run_cli(home, &["config", "set", "reset.minute", "0"]);

    let db = Database::open_at(&home.path().join("viewbudget.db")).unwrap();
    let today = day_key(&Local::now().fixed_offset());
    db.kv_set("https://www.youtube.com", RESET_MARKER_KEY, r#""Thu Jan 01 2026""#)
        .unwrap();
    db.kv_set(
        "https://www.youtube.com",
        USAGE_KEY,
        &format!(r#"{{"{today}": 3000000}}"#),
    )
    .unwrap();
}

#[test]
fn test_status_fresh_site() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(&home, &["status", YOUTUBE]);
    assert_eq!(code, 0, "status failed: {stderr}");

    let value = json(&stdout);
    assert_eq!(value["type"], "StateSnapshot");
    assert_eq!(value["origin"], "https://www.youtube.com");
    assert_eq!(value["accumulated_ms"], 0);
    assert_eq!(value["limit_minutes"], 60);
    assert_eq!(value["remaining_ms"], 3_600_000);
}

#[test]
fn test_status_history() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["status", YOUTUBE, "--history"]);
    assert_eq!(code, 0);
    assert!(json(&stdout)["history"].is_object());
}

#[test]
fn test_status_rejects_uncovered_site() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["status", "https://example.com/"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not covered"), "stderr: {stderr}");
}

#[test]
fn test_limit_set_and_get() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(&home, &["limit", "set", YOUTUBE, "45"]);
    assert_eq!(code, 0, "limit set failed: {stderr}");

    let (stdout, _, code) = run_cli(&home, &["limit", "get", YOUTUBE]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "45");

    // Limits are per origin.
    let (stdout, _, _) = run_cli(&home, &["limit", "get", "https://www.bilibili.com/"]);
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn test_limit_set_rejects_invalid_input() {
    let home = TempDir::new().unwrap();
    for bad in ["abc", "0", "-3"] {
        let (_, stderr, code) = run_cli(&home, &["limit", "set", YOUTUBE, bad]);
        assert_eq!(code, 1, "input {bad} accepted");
        assert!(stderr.contains("invalid limit"), "stderr: {stderr}");
    }

    let (stdout, _, _) = run_cli(&home, &["limit", "get", YOUTUBE]);
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn test_reset_reports_result() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(&home, &["reset", YOUTUBE]);
    assert_eq!(code, 0, "reset failed: {stderr}");

    let value = json(&stdout);
    assert_eq!(value["origin"], "https://www.youtube.com");
    assert!(value["reset"].is_boolean());

    // A second run on the same day never resets again.
    let (stdout, _, _) = run_cli(&home, &["reset", YOUTUBE]);
    assert_eq!(json(&stdout)["reset"], false);
}

#[test]
fn test_match() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["match", "https://m.bilibili.com/video/1"]);
    assert_eq!(code, 0);
    let value = json(&stdout);
    assert_eq!(value["matched"], true);
    assert_eq!(value["pattern"], "*://*.bilibili.com/*");
    assert_eq!(value["origin"], "https://m.bilibili.com");

    let (stdout, _, code) = run_cli(&home, &["match", "https://example.com/"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["matched"], false);
}

#[test]
fn test_match_invalid_url() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(&home, &["match", "not a url"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_get_set() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["config", "get", "limits.default_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");

    let (_, stderr, code) = run_cli(&home, &["config", "set", "ui.locale", "en"]);
    assert_eq!(code, 0, "config set failed: {stderr}");
    let (stdout, _, _) = run_cli(&home, &["config", "get", "ui.locale"]);
    assert_eq!(stdout.trim(), "en");

    let (_, _, code) = run_cli(&home, &["config", "set", "reset.hour", "25"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(&home, &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list_and_reset() {
    let home = TempDir::new().unwrap();
    let _ = run_cli(&home, &["config", "set", "limits.default_minutes", "90"]);
    let (stdout, _, code) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["limits"]["default_minutes"], 90);

    let (_, _, code) = run_cli(&home, &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(&home, &["config", "get", "limits.default_minutes"]);
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn test_default_limit_from_config() {
    let home = TempDir::new().unwrap();
    let _ = run_cli(&home, &["config", "set", "limits.default_minutes", "25"]);
    let (stdout, _, _) = run_cli(&home, &["limit", "get", YOUTUBE]);
    assert_eq!(stdout.trim(), "25");
}

#[test]
fn test_watch_saves_limit_from_stdin() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli_with_input(
        &home,
        &["watch", YOUTUBE, "--hidden"],
        "limit 30\nstatus\nquit\n",
    );
    assert_eq!(code, 0, "watch failed: {stderr}");
    assert!(stdout.contains("设置已保存"), "stdout: {stdout}");

    let (stdout, _, _) = run_cli(&home, &["limit", "get", YOUTUBE]);
    assert_eq!(stdout.trim(), "30");
}

#[test]
fn test_watch_ends_on_eof() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli_with_input(&home, &["watch", YOUTUBE], "");
    assert_eq!(code, 0, "watch failed: {stderr}");
    assert!(stdout.contains("剩余时间"), "stdout: {stdout}");
}

#[test]
fn test_limit_set_applies_daily_reset_first() {
    let home = TempDir::new().unwrap();
    seed_unreset_usage(&home);

    let (_, stderr, code) = run_cli(&home, &["limit", "set", YOUTUBE, "30"]);
    assert_eq!(code, 0, "limit set failed: {stderr}");

    let (stdout, _, _) = run_cli(&home, &["limit", "get", YOUTUBE]);
    assert_eq!(stdout.trim(), "30");

    let (stdout, _, _) = run_cli(&home, &["status", YOUTUBE]);
    let value = json(&stdout);
    assert_eq!(value["accumulated_ms"], 0);
    assert_eq!(value["reset"], false);
}

#[test]
fn test_status_applies_daily_reset_first() {
    let home = TempDir::new().unwrap();
    seed_unreset_usage(&home);

    let (stdout, stderr, code) = run_cli(&home, &["status", YOUTUBE, "--history"]);
    assert_eq!(code, 0, "status failed: {stderr}");

    let value = json(&stdout);
    assert_eq!(value["reset"], true);
    assert_eq!(value["accumulated_ms"], 0);
    assert_eq!(value["history"], serde_json::json!({}));
}

#[test]
fn test_reset_reports_boundary() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(&home, &["reset", YOUTUBE]);
    assert_eq!(code, 0);
    assert_eq!(json(&stdout)["boundary"], "18:00");
}
