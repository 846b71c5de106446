//! CLI integration tests.
//!
//! These tests verify argument parsing and error output without
//! requiring a running Keyward daemon.

use std::process::Command;

/// Nothing listens here; connecting fails immediately.
const DEAD_ADDR: &str = "127.0.0.1:1";

/// Runs the CLI binary with args and captures (exit_code, stdout, stderr).
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_keyward"))
        .args(args)
        .env_remove("KEYWARD_PASSWORD")
        .output();

    match output {
        Ok(o) => {
            let code = o.status.code().unwrap_or(-1);
            let stdout = String::from_utf8_lossy(&o.stdout).to_string();
            let stderr = String::from_utf8_lossy(&o.stderr).to_string();
            (code, stdout, stderr)
        }
        Err(e) => {
            eprintln!("WARNING: could not run binary: {e}");
            (-1, String::new(), e.to_string())
        }
    }
}

// -----------------------------------------------------------------------
// Clap parsing
// -----------------------------------------------------------------------

#[test]
fn help_flag_exits_zero() {
    let (code, stdout, _) = run_cli(&["--help"]);
    assert_eq!(code, 0, "--help should exit 0");
    assert!(stdout.contains("account"), "help should list the account command");
}

#[test]
fn version_flag_exits_zero() {
    let (code, stdout, _) = run_cli(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("keyward"));
}

#[test]
fn unknown_command_fails() {
    let (code, _, stderr) = run_cli(&["nonexistent"]);
    assert_ne!(code, 0);
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized"),
        "stderr should indicate error: {stderr}"
    );
}

#[test]
fn account_help_lists_actions() {
    let (code, stdout, _) = run_cli(&["account", "--help"]);
    assert_eq!(code, 0);
    for action in ["create", "login", "logout", "selected"] {
        assert!(stdout.contains(action), "missing '{action}' in: {stdout}");
    }
}

#[test]
fn node_help_lists_actions() {
    let (code, stdout, _) = run_cli(&["node", "--help"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("status"));
    assert!(stdout.contains("restart"));
}

#[test]
fn login_requires_address() {
    let (code, _, stderr) = run_cli(&["account", "login"]);
    assert_ne!(code, 0);
    assert!(!stderr.is_empty());
}

#[test]
fn invalid_rpc_addr_rejected_by_parser() {
    let (code, _, stderr) = run_cli(&["--rpc-addr", "not-an-addr", "node", "status"]);
    assert_eq!(code, 2, "clap usage errors exit 2: {stderr}");
}

// -----------------------------------------------------------------------
// Runtime errors
// -----------------------------------------------------------------------

#[test]
fn malformed_address_rejected_before_connecting() {
    let (code, _, stderr) = run_cli(&[
        "--rpc-addr",
        DEAD_ADDR,
        "account",
        "login",
        "abcd",
        "--password",
        "pw",
    ]);
    assert_eq!(code, 1);
    assert!(stderr.contains("64 hex characters"), "got: {stderr}");
}

#[test]
fn json_mode_errors_are_json() {
    let (code, _, stderr) = run_cli(&["--json", "--rpc-addr", DEAD_ADDR, "node", "status"]);
    assert_eq!(code, 1);
    let parsed: serde_json::Value = serde_json::from_str(stderr.trim())
        .unwrap_or_else(|_| panic!("JSON mode stderr should be valid JSON, got: {stderr}"));
    assert!(parsed["error"].is_string());
}

#[test]
fn unreachable_daemon_reports_connection_error() {
    let (code, _, stderr) = run_cli(&["--rpc-addr", DEAD_ADDR, "account", "selected"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("failed to connect"), "got: {stderr}");
}
