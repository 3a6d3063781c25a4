use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::sequencer::{SequencerState, Step, StepKind, StepResult};

/// A persisted coding task: its instruction, where the sequencer stopped,
/// and every step result produced so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub instruction: String,
    /// Sequencer state after the last completed step
    pub sequencer: SequencerState,
    /// Step results in the order they were produced
    pub results: Vec<StepResult>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub working_dir: String,
    pub error: Option<String>,
    /// File the latest generated code was written to
    #[serde(default)]
    pub artifact: Option<PathBuf>,
}

impl SessionState {
    pub fn new(instruction: impl Into<String>, working_dir: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            instruction: instruction.into(),
            sequencer: SequencerState::Idle,
            results: Vec::new(),
            status: SessionStatus::Pending,
            created_at: now,
            updated_at: now,
            working_dir: working_dir.into(),
            error: None,
            artifact: None,
        }
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Record a step result and the state the sequencer moved to
    pub fn record(&mut self, result: StepResult, sequencer: SequencerState) {
        if result.step() == StepKind::GenerateCode {
            self.artifact = None;
        }
        self.results.push(result);
        self.sequencer = sequencer;
        self.updated_at = Utc::now();
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = SessionStatus::Failed;
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// The most recent result, which is the message fed to the next step
    pub fn last_result(&self) -> Option<&StepResult> {
        self.results.last()
    }

    /// The generated code still waiting to be written before `RunCode` runs.
    ///
    /// `None` once the artifact exists, or when extraction missed.
    pub fn unwritten_code(&self) -> Option<&StepResult> {
        if self.artifact.is_some()
            || !matches!(self.sequencer, SequencerState::Active(Step::RunCode { .. }))
        {
            return None;
        }

        self.results
            .iter()
            .rev()
            .find(|r| r.step() == StepKind::GenerateCode)
            .filter(|r| !r.extraction_missed() && r.next_path().is_some())
    }

    /// Failed sessions can be resumed too; the failing step is simply retried
    pub fn can_resume(&self) -> bool {
        !matches!(self.status, SessionStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => anyhow::bail!(
                "invalid session status '{}' (expected: pending, in_progress, completed, failed)",
                s
            ),
        }
    }
}

/// One row of `coding-agent sessions`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub instruction: String,
    pub status: SessionStatus,
    pub sequencer: String,
    pub updated_at: String,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = if self.instruction.chars().count() > 50 {
            self.instruction.chars().take(47).collect::<String>() + "..."
        } else {
            self.instruction.clone()
        };
        let id_short: String = self.id.chars().take(8).collect();

        write!(
            f,
            "{:<10} {:<12} {:<28} {}",
            id_short, self.status, self.sequencer, preview
        )
    }
}
