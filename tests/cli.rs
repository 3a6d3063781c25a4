use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_shows_usage() {
    cargo_bin_cmd!("coding-agent")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("LLM coding agent"));
}

#[test]
fn test_version_shows_version() {
    cargo_bin_cmd!("coding-agent")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("coding-agent"));
}

#[test]
fn test_sessions_command_works_with_no_sessions() {
    let home = TempDir::new().expect("create temp home");
    cargo_bin_cmd!("coding-agent")
        .env("HOME", home.path())
        .arg("sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found."));
}

#[test]
fn test_sessions_rejects_unknown_status() {
    let home = TempDir::new().expect("create temp home");
    cargo_bin_cmd!("coding-agent")
        .env("HOME", home.path())
        .args(["sessions", "--status", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid session status"));
}

#[test]
fn test_unknown_provider_fails_gracefully() {
    cargo_bin_cmd!("coding-agent")
        .args(["--provider", "nonexistent", "run", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

#[test]
fn test_run_without_api_key_fails_gracefully() {
    cargo_bin_cmd!("coding-agent")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("CODING_AGENT_PROVIDER")
        .args(["run", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}
