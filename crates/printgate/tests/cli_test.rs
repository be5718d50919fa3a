//! Integration tests for the `printgate` CLI binary.
//!
//! Argument parsing, help output, completions, and error handling run
//! without a device service; status and precondition checks run against
//! a wiremock stand-in.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const NO_CONFIG_DIR: &str = "/tmp/printgate-cli-test-nonexistent";

/// Build a [`Command`] for the `printgate` binary with env isolation.
///
/// Clears all `PRINTGATE_*` env vars and points config directories at
/// `config_dir` so tests never touch the user's real configuration.
fn printgate_cmd_in(config_dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("printgate");
    cmd.env("HOME", config_dir)
        .env("XDG_CONFIG_HOME", config_dir)
        .env("NO_COLOR", "1");
    for (key, _) in std::env::vars() {
        if key.starts_with("PRINTGATE_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn printgate_cmd() -> assert_cmd::Command {
    printgate_cmd_in(Path::new(NO_CONFIG_DIR))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || printgate_cmd().args(args).output().unwrap())
        .await
        .unwrap()
}

async fn mock_status(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/device-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = printgate_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    printgate_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("fingerprint")
            .and(predicate::str::contains("capture"))
            .and(predicate::str::contains("enroll"))
            .and(predicate::str::contains("identify")),
    );
}

#[test]
fn test_version_flag() {
    printgate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("printgate"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    printgate_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    printgate_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_capture_rejects_slot_three() {
    let output = printgate_cmd()
        .args(["capture", "--slot", "3"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("slot"), "Expected slot error:\n{text}");
}

#[test]
fn test_capture_rejects_unknown_method() {
    printgate_cmd()
        .args(["capture", "--slot", "1", "--method", "index-finger"])
        .assert()
        .code(2);
}

#[test]
fn test_enroll_requires_name_and_id() {
    let output = printgate_cmd()
        .args(["enroll", "--name", "Alice"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--id-number"));
}

#[test]
fn test_invalid_service_url() {
    let output = printgate_cmd()
        .args(["status", "--service", "ftp://scanner"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("http or https"));
}

// ── Service errors ──────────────────────────────────────────────────

#[test]
fn test_status_unreachable_service() {
    let output = printgate_cmd()
        .args(["status", "--service", "http://127.0.0.1:1", "--timeout", "2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "Expected connection exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("Could not connect"),
        "Expected connection error:\n{text}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_plain_and_json() {
    let server = MockServer::start().await;
    mock_status(
        &server,
        serde_json::json!({ "status": "ready", "templates": { "template1": true } }),
    )
    .await;

    let plain = run_blocking(vec![
        "status".into(),
        "-o".into(),
        "plain".into(),
        "--service".into(),
        server.uri(),
    ])
    .await;
    assert!(plain.status.success(), "{}", combined_output(&plain));
    assert_eq!(String::from_utf8_lossy(&plain.stdout).trim(), "ready");

    let json = run_blocking(vec![
        "status".into(),
        "-o".into(),
        "json".into(),
        "--service".into(),
        server.uri(),
    ])
    .await;
    assert!(json.status.success(), "{}", combined_output(&json));
    let value: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(value["status"], "ready");
    assert_eq!(value["templates"]["template1"], true);
    assert_eq!(value["templates"]["template2"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_identify_requires_initialized_device() {
    let server = MockServer::start().await;
    mock_status(&server, serde_json::json!({ "status": "not_initialized" })).await;

    let output = run_blocking(vec!["identify".into(), "--service".into(), server.uri()]).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("printgate init"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_match_without_templates_is_usage_error() {
    let server = MockServer::start().await;
    mock_status(
        &server,
        serde_json::json!({ "status": "ready", "templates": { "template1": true } }),
    )
    .await;

    let output = run_blocking(vec!["match".into(), "--service".into(), server.uri()]).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("printgate capture --slot 2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_match_reports_result() {
    let server = MockServer::start().await;
    mock_status(
        &server,
        serde_json::json!({
            "status": "ready",
            "templates": { "template1": true, "template2": true }
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/match_templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true, "matched": true, "score": 87.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_blocking(vec![
        "match".into(),
        "-o".into(),
        "json-compact".into(),
        "--service".into(),
        server.uri(),
    ])
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["matched"], true);
    assert_eq!(value["score"], 87.5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("fingerprints match (score 87.5)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_init_failure_uses_service_message() {
    let server = MockServer::start().await;
    mock_status(&server, serde_json::json!({ "status": "not_initialized" })).await;
    Mock::given(method("POST"))
        .and(path("/api/init-device"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({ "message": "Scanner not found" })),
        )
        .mount(&server)
        .await;

    let output = run_blocking(vec!["init".into(), "--service".into(), server.uri()]).await;
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("Scanner not found"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    printgate_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("printgate").and(predicate::str::contains("config.toml")));
}

#[test]
fn test_config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();

    printgate_cmd_in(dir.path())
        .args(["config", "set", "service", "http://10.0.0.5:3000"])
        .assert()
        .success();
    printgate_cmd_in(dir.path())
        .args(["config", "set", "session_timeout", "90"])
        .assert()
        .success();

    let output = printgate_cmd_in(dir.path())
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["profiles"]["default"]["service"], "http://10.0.0.5:3000");
    assert_eq!(value["profiles"]["default"]["session_timeout"], 90);
}

#[test]
fn test_config_set_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let output = printgate_cmd_in(dir.path())
        .args(["config", "set", "site", "lab"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown config key"));
}

#[test]
fn test_config_use_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = printgate_cmd_in(dir.path())
        .args(["config", "use", "lab"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("Profile 'lab' not found"));
}
