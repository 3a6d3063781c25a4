use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use super::Tool;

/// System locations no tool may touch (macOS resolves /etc to /private/etc)
const DENIED_ROOTS: &[&str] = &["/etc", "/private/etc", "/proc", "/sys", "/dev", "/var/log"];

/// Credential directories under $HOME
const DENIED_HOME_DIRS: &[&str] = &[".ssh", ".gnupg", ".aws", ".config"];

/// Canonicalize the nearest existing ancestor of `path` and re-append the
/// components that do not exist yet
fn resolve(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        let probe = if existing.as_os_str().is_empty() {
            Path::new(".")
        } else {
            existing
        };

        match std::fs::canonicalize(probe) {
            Ok(canonical) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(canonical, |acc, part| acc.join(part)));
            }
            Err(_) => {
                let name = existing.file_name().context("path has no file name")?;
                missing.push(name.to_os_string());
                existing = existing.parent().context("path has no existing ancestor")?;
            }
        }
    }
}

/// Resolve `path` and reject traversal or sensitive locations.
///
/// The file and any of its parent directories may not exist yet.
pub fn validate_path(path: &str) -> Result<PathBuf> {
    if path.contains("..") {
        anyhow::bail!("path traversal detected: '..' is not allowed in paths");
    }

    let canonical =
        resolve(Path::new(path)).with_context(|| format!("failed to resolve path: {}", path))?;

    for root in DENIED_ROOTS {
        if canonical.starts_with(root) {
            anyhow::bail!("access to {} is not allowed", root);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        for dir in DENIED_HOME_DIRS {
            if canonical.starts_with(Path::new(&home).join(dir)) {
                anyhow::bail!("access to ~/{} is not allowed", dir);
            }
        }
    }

    if canonical.components().any(|c| c.as_os_str() == ".git") {
        anyhow::bail!("access to .git directories is not allowed");
    }

    if let Some(name) = canonical.file_name().map(|n| n.to_string_lossy()) {
        if name == ".env" || name.starts_with(".env.") {
            anyhow::bail!("access to .env files is not allowed");
        }
    }

    Ok(canonical)
}

fn path_param(params: &Value) -> Result<&str> {
    params["path"].as_str().context("missing 'path' parameter")
}

/// Reads a file's content back to the model
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path and return them"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let path = path_param(&params)?;
        let validated = validate_path(path)?;

        tokio::fs::read_to_string(&validated)
            .await
            .with_context(|| format!("failed to read file: {}", path))
    }
}

/// Writes text content to a named file, creating parent directories
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file at the given path, creating parent directories if needed"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The exact content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let path = path_param(&params)?;
        let content = params["content"]
            .as_str()
            .context("missing 'content' parameter")?;

        let validated = validate_path(path)?;

        if let Some(parent) = validated.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        tokio::fs::write(&validated, content)
            .await
            .with_context(|| format!("failed to write file: {}", path))?;

        Ok(format!("Wrote {} bytes to {}", content.len(), path))
    }
}
