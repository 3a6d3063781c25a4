//! Agent configuration.
//!
//! Precedence, highest first: CLI flags, `CODING_AGENT_*` environment
//! variables, `.coding-agent.toml` in the working directory, defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::agents::DEFAULT_MAX_TOOL_ITERATIONS;
use crate::error::AgentError;
use crate::sequencer::{CodeFence, DEFAULT_ARTIFACT_PATH, DEFAULT_INTERPRETER, SequencerConfig};

pub const CONFIG_FILE_NAME: &str = ".coding-agent.toml";
pub const DEFAULT_PROVIDER: &str = "anthropic";

const PROVIDER_ENV: &str = "CODING_AGENT_PROVIDER";
const MODEL_ENV: &str = "CODING_AGENT_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider ("anthropic" or "openai")
    pub provider: Option<String>,

    /// Provider-specific model name
    pub model: Option<String>,

    /// Language label of the code block to extract
    pub language: String,

    /// Where generated code is written and run from
    pub artifact_path: PathBuf,

    /// Command that runs the artifact
    pub interpreter: String,

    /// Tool round-trips allowed per generation request
    pub max_tool_iterations: usize,

    /// Write the extracted code to `artifact_path` before running it
    pub persist_artifact: bool,

    /// Persist every run as a resumable session
    pub save_sessions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            language: "python".to_string(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            persist_artifact: true,
            save_sessions: false,
        }
    }
}

impl AgentConfig {
    /// Load `.coding-agent.toml` from the current directory, if present,
    /// and apply environment overrides.
    pub fn load() -> Result<Self, AgentError> {
        let path = Path::new(CONFIG_FILE_NAME);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            debug!("no config file found, using defaults");
            Self::default()
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, AgentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AgentError> {
        toml::from_str(content).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Override provider and model from environment lookups
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(provider) = lookup(PROVIDER_ENV).filter(|v| !v.is_empty()) {
            self.provider = Some(provider);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.is_empty()) {
            self.model = Some(model);
        }
        self
    }

    /// Provider name, falling back to the default
    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn sequencer_config(&self) -> Result<SequencerConfig, AgentError> {
        if self.interpreter.trim().is_empty() {
            return Err(AgentError::Config("interpreter must not be empty".to_string()));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(AgentError::Config("artifact_path must not be empty".to_string()));
        }
        if self.max_tool_iterations == 0 {
            return Err(AgentError::Config(
                "max_tool_iterations must be at least 1".to_string(),
            ));
        }

        Ok(SequencerConfig {
            fence: CodeFence::new(&self.language)?,
            artifact_path: self.artifact_path.clone(),
            interpreter: self.interpreter.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_python_flow() {
        let config = AgentConfig::default();
        assert_eq!(config.provider_name(), "anthropic");
        assert_eq!(config.artifact_path, PathBuf::from("generated_code.py"));

        let seq = config.sequencer_config().unwrap();
        assert_eq!(seq.fence.language(), "python");
        assert_eq!(
            seq.run_command(&seq.artifact_path),
            "python generated_code.py"
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AgentConfig::from_toml_str(
            r#"
provider = "openai"
artifact_path = "out/solution.py"
"#,
        )
        .unwrap();

        assert_eq!(config.provider_name(), "openai");
        assert_eq!(config.artifact_path, PathBuf::from("out/solution.py"));
        assert_eq!(config.interpreter, "python");
        assert!(config.persist_artifact);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = AgentConfig::from_toml_str("provider = [").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("CODING_AGENT_PROVIDER", "openai"),
            ("CODING_AGENT_MODEL", "gpt-4o-mini"),
        ]
        .into_iter()
        .collect();

        let config = AgentConfig {
            provider: Some("anthropic".to_string()),
            ..AgentConfig::default()
        }
        .with_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.provider_name(), "openai");
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = AgentConfig {
            interpreter: " ".to_string(),
            ..AgentConfig::default()
        };
        assert!(config.sequencer_config().is_err());

        let config = AgentConfig {
            language: String::new(),
            ..AgentConfig::default()
        };
        assert!(config.sequencer_config().is_err());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "interpreter = \"python3\"\nsave_sessions = true\n").unwrap();

        let config = AgentConfig::load_from(&path).unwrap();
        assert_eq!(config.interpreter, "python3");
        assert!(config.save_sessions);
    }
}
