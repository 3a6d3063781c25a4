use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::AgentError;

/// One discrete unit of sequencer work, with the parameters it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Ask the model for code implementing the instruction
    GenerateCode,
    /// Ask the model to execute the file at `path`
    RunCode { path: PathBuf },
    /// Ask the model to read back the file at `path`
    ReadFile { path: PathBuf },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::GenerateCode => StepKind::GenerateCode,
            Self::RunCode { .. } => StepKind::RunCode,
            Self::ReadFile { .. } => StepKind::ReadFile,
        }
    }
}

/// Identity of a step, without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    GenerateCode,
    RunCode,
    ReadFile,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerateCode => write!(f, "generate_code"),
            Self::RunCode => write!(f, "run_code"),
            Self::ReadFile => write!(f, "read_file"),
        }
    }
}

/// The single mutable value owned by a sequencer.
///
/// `Idle` is both the initial state and the terminal state of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    #[default]
    Idle,
    Active(Step),
}

impl SequencerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Active(Step::GenerateCode) => write!(f, "generate_code"),
            Self::Active(Step::RunCode { path }) => write!(f, "run_code:{}", path.display()),
            Self::Active(Step::ReadFile { path }) => write!(f, "read_file:{}", path.display()),
        }
    }
}

impl FromStr for SequencerState {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = match s.split_once(':') {
            Some((name, path)) => (name, Some(path)),
            None => (s, None),
        };

        let with_path = |path: Option<&str>| -> Result<PathBuf, AgentError> {
            match path {
                Some(p) if !p.is_empty() => Ok(PathBuf::from(p)),
                _ => Err(AgentError::InvalidTransition(format!(
                    "state '{}' requires a file path",
                    name
                ))),
            }
        };

        match (name, path) {
            ("idle", None) => Ok(Self::Idle),
            ("generate_code", None) => Ok(Self::Active(Step::GenerateCode)),
            ("run_code", p) => Ok(Self::Active(Step::RunCode { path: with_path(p)? })),
            ("read_file", p) => Ok(Self::Active(Step::ReadFile { path: with_path(p)? })),
            _ => Err(AgentError::InvalidTransition(format!(
                "unknown sequencer state '{}' (expected: idle, generate_code, run_code:<path>, read_file:<path>)",
                s
            ))),
        }
    }
}

/// Output of one step invocation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    step: StepKind,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_path: Option<PathBuf>,
    #[serde(default)]
    extraction_missed: bool,
}

impl StepResult {
    /// Result of a `GenerateCode` step. `code` is `None` when the response
    /// held no recognizable code block.
    pub(crate) fn generated(code: Option<String>, next_path: PathBuf) -> Self {
        let extraction_missed = code.is_none();
        Self {
            step: StepKind::GenerateCode,
            content: code.unwrap_or_default(),
            next_path: Some(next_path),
            extraction_missed,
        }
    }

    /// Result carrying a raw generation response
    pub(crate) fn response(step: StepKind, content: String) -> Self {
        Self {
            step,
            content,
            next_path: None,
            extraction_missed: false,
        }
    }

    /// The step that produced this result
    pub fn step(&self) -> StepKind {
        self.step
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Destination path handed to the following step (`GenerateCode` only)
    pub fn next_path(&self) -> Option<&Path> {
        self.next_path.as_deref()
    }

    /// True when a `GenerateCode` response contained no code block.
    ///
    /// The content is then the empty string, which is otherwise
    /// indistinguishable from the model genuinely producing empty code.
    pub fn extraction_missed(&self) -> bool {
        self.extraction_missed
    }
}
