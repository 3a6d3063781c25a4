use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

use super::Tool;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_OUTPUT_BYTES: usize = 100_000;

/// Patterns that are refused outright. Not a sandbox.
const DESTRUCTIVE_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "rm -rf $home",
    ":(){:|:&};:",
    "mkfs.",
    "dd if=/dev/zero",
    "dd if=/dev/random",
    "> /dev/sda",
    "chmod -r 777 /",
    "sudo rm",
    "sudo dd",
    "sudo mkfs",
];

/// Runs a command through `bash -c` and returns its output
pub struct RunCommandTool {
    default_timeout: Duration,
}

impl RunCommandTool {
    pub fn with_timeout(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a command in the terminal (e.g. `python generated_code.py`) and return its output"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Optional working directory for the command"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Optional timeout in seconds"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let command = params["command"]
            .as_str()
            .context("missing 'command' parameter")?;
        let limit = params["timeout_secs"]
            .as_u64()
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        // Safety check
        check_command(command)?;

        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = params["working_dir"].as_str() {
            cmd.current_dir(dir);
        }

        debug!(command, "running command");

        // Execute with timeout
        let output = timeout(limit, cmd.output())
            .await
            .with_context(|| format!("command timed out after {} seconds", limit.as_secs()))?
            .with_context(|| format!("failed to execute command: {}", command))?;

        Ok(format_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            output.status.code(),
        ))
    }
}

fn check_command(command: &str) -> Result<()> {
    let lower = command.to_lowercase();
    if let Some(pattern) = DESTRUCTIVE_PATTERNS.iter().find(|p| lower.contains(**p)) {
        anyhow::bail!("command contains destructive pattern: {}", pattern);
    }
    Ok(())
}

/// Combine stdout, stderr and a non-zero exit code into one report
fn format_output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let mut result = stdout.to_string();

    if !stderr.is_empty() {
        if !result.is_empty() {
            result.push_str("\n--- stderr ---\n");
        }
        result.push_str(stderr);
    }

    match exit_code {
        Some(0) => {}
        Some(code) => result.push_str(&format!("\n[exit code: {}]", code)),
        None => result.push_str("\n[terminated by signal]"),
    }

    // Truncate on a char boundary
    if result.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
        result.push_str("\n... [output truncated]");
    }

    if result.is_empty() {
        result.push_str("[no output]");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destructive_commands_are_refused() {
        assert!(check_command("rm -rf /").is_err());
        assert!(check_command("sudo rm -rf /tmp/x").is_err());
        assert!(check_command("dd if=/dev/zero of=/dev/sda").is_err());
        assert!(check_command("python generated_code.py").is_ok());
    }

    #[test]
    fn output_includes_stderr_and_exit_code() {
        let out = format_output("ok\n", "warning\n", Some(2));
        assert!(out.starts_with("ok\n"));
        assert!(out.contains("--- stderr ---\nwarning"));
        assert!(out.ends_with("[exit code: 2]"));
    }

    #[test]
    fn empty_output_is_reported() {
        assert_eq!(format_output("", "", Some(0)), "[no output]");
    }

    #[test]
    fn long_output_is_truncated() {
        let long = "é".repeat(MAX_OUTPUT_BYTES);
        let out = format_output(&long, "", Some(0));
        assert!(out.len() <= MAX_OUTPUT_BYTES + 32);
        assert!(out.ends_with("[output truncated]"));
    }

    #[tokio::test]
    async fn runs_a_command() {
        let out = RunCommandTool::default()
            .execute(json!({ "command": "echo hello" }))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }
}
