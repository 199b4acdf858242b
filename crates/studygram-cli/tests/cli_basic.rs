//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify the JSON it prints.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studygram"))
        .env("STUDYGRAM_DATA_DIR", data_dir)
        .env("STUDYGRAM_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_log_session_accrues_xp() {
    let dir = tempfile::tempdir().unwrap();
    let event = run_json(dir.path(), &["focus", "log", "--minutes", "25", "--subject", "Physics"]);
    assert_eq!(event["type"], "session_recorded");
    assert_eq!(event["earned_xp"], 25);
    assert_eq!(event["streak"], "started");
    assert_eq!(event["stats"]["xp"], 25);
    assert_eq!(event["stats"]["current_streak"], 1);
}

// The binary runs on the system clock, so streak outcomes that depend on
// both runs landing on one local day are covered by the FixedClock ledger
// tests in studygram-core instead.
#[test]
fn test_sessions_accumulate_totals() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["focus", "log", "--minutes", "25"]);
    run_json(dir.path(), &["focus", "log", "--minutes", "50"]);

    let stats = run_json(dir.path(), &["stats", "show"]);
    assert_eq!(stats["user_id"], "local");
    assert_eq!(stats["xp"], 75);
    assert_eq!(stats["total_minutes"], 75);
    assert_eq!(stats["level"], 1);
    assert_eq!(stats["xp_to_next_level"], 225);
}

#[test]
fn test_zero_minutes_rejected_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["focus", "log", "--minutes", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"), "stderr: {stderr}");

    let stats = run_json(dir.path(), &["stats", "show"]);
    assert_eq!(stats["xp"], 0);
    let sessions = run_json(dir.path(), &["stats", "sessions"]);
    assert_eq!(sessions.as_array().unwrap().len(), 0);
}

#[test]
fn test_users_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["--user", "asha", "focus", "log", "--minutes", "75"]);
    let asha = run_json(dir.path(), &["stats", "show", "--user", "asha"]);
    let local = run_json(dir.path(), &["stats", "show"]);
    assert_eq!(asha["xp"], 75);
    assert_eq!(local["xp"], 0);
}

#[test]
fn test_timer_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let started = run_json(
        dir.path(),
        &["focus", "start", "--minutes", "15", "--subject", "Maths", "--goal", "20 MCQs"],
    );
    assert_eq!(started["type"], "timer_started");
    assert_eq!(started["minutes"], 15);

    let status = run_json(dir.path(), &["focus", "status"]);
    assert_eq!(status["state"], "running");
    assert_eq!(status["subject"], "Maths");

    // Not finished yet, so nothing can be saved.
    let (_, _, code) = run_cli(dir.path(), &["focus", "complete"]);
    assert_ne!(code, 0);

    let paused = run_json(dir.path(), &["focus", "pause"]);
    assert_eq!(paused["type"], "timer_paused");

    let reset = run_json(dir.path(), &["focus", "reset"]);
    assert_eq!(reset["type"], "timer_reset");
    let status = run_json(dir.path(), &["focus", "status"]);
    assert_eq!(status["state"], "ready");
    assert_eq!(status["remaining_ms"], 15 * 60 * 1000);
    assert_eq!(status["remaining"], "15:00");
}

#[test]
fn test_start_rejects_unknown_preset() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["focus", "start", "--minutes", "40"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("minutes"), "stderr: {stderr}");
}

#[test]
fn test_recompute_matches_show() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["focus", "log", "--minutes", "25"]);
    run_json(dir.path(), &["focus", "log", "--minutes", "15"]);
    let shown = run_json(dir.path(), &["stats", "show"]);
    let rebuilt = run_json(dir.path(), &["stats", "recompute"]);
    assert_eq!(shown, rebuilt);

    // Both sessions count today unless the two logs straddled midnight.
    let today = run_json(dir.path(), &["stats", "today"]);
    let sessions = run_json(dir.path(), &["stats", "sessions"]);
    let on_today: Vec<_> = sessions
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["date"] == today["date"])
        .collect();
    assert_eq!(today["sessions"], on_today.len());
    let minutes: u64 = on_today.iter().map(|s| s["minutes"].as_u64().unwrap()).sum();
    assert_eq!(today["minutes"], minutes);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "focus.default_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "focus.default_minutes", "50"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "focus.default_minutes"]);
    assert_eq!(stdout.trim(), "50");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "focus.nope", "1"]);
    assert_ne!(code, 0);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "focus.nope"]);
    assert_ne!(code, 0);
}
