//! CLI integration tests

use std::process::{Command, Output};

fn aiops(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aiops"))
        .args(args)
        .env_remove("AIOPS_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = aiops(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("CloudShop AI-Ops"),
        "Should show app description"
    );
    for command in [
        "ask",
        "summary",
        "errors",
        "top",
        "cpu",
        "pods",
        "restart",
        "scale",
        "rollout",
        "self-heal",
        "health",
    ] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = aiops(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("aiops"), "Should show binary name");
}

#[test]
fn test_self_heal_help_lists_overrides() {
    let output = aiops(&["self-heal", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--service"));
    assert!(stdout.contains("--deployment"));
    assert!(stdout.contains("--namespace"));
    assert!(stdout.contains("--minutes"));
    assert!(stdout.contains("--timeout"));
}

#[test]
fn test_cpu_help_lists_window_options() {
    let output = aiops(&["cpu", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--minutes"));
    assert!(stdout.contains("--period"));
    assert!(stdout.contains("--namespace"));
}

#[test]
fn test_scale_requires_replicas() {
    let output = aiops(&["scale", "orders-deployment"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--replicas"));
}

#[test]
fn test_ask_requires_a_question() {
    let output = aiops(&["ask"]);

    assert!(!output.status.success());
}

/// Unreachable bot: the command fails with a connection error
#[test]
fn test_unreachable_bot_fails() {
    let output = aiops(&["--api-url", "http://127.0.0.1:9", "summary"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to send request"));
}
