use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};

use super::ToolAssistedGenerator;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::{Generator, LlmProvider};
use crate::sequencer::{Sequencer, SequencerConfig, SequencerState, StepKind, StepResult};
use crate::session::{SessionState, SessionStatus, Storage};
use crate::tools::{Tool, ToolRegistry, WriteFileTool};

/// What a finished task produced
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub session_id: String,
    /// Result of the `GenerateCode` step
    pub generated: StepResult,
    /// Result of the `RunCode` step
    pub execution: StepResult,
    /// Where the code was written, if it was
    pub artifact: Option<PathBuf>,
}

/// The coding role: feeds an instruction through the sequencer until the
/// chain returns to idle, writing the generated code to disk in between.
///
/// A task that fails is kept so `retry` can continue it; a new `run`
/// abandons it instead.
pub struct CodingAgent {
    sequencer: Sequencer,
    generator: Box<dyn Generator>,
    persist_artifact: bool,
    storage: Option<Box<dyn Storage>>,
    unfinished: Option<SessionState>,
}

impl CodingAgent {
    pub fn new(config: SequencerConfig, generator: Box<dyn Generator>) -> Self {
        Self {
            sequencer: Sequencer::new(config),
            generator,
            persist_artifact: true,
            storage: None,
            unfinished: None,
        }
    }

    /// Build an agent backed by `provider` and the write/run/read tools
    pub fn from_config(
        config: &AgentConfig,
        provider: Box<dyn LlmProvider>,
    ) -> Result<Self, AgentError> {
        let generator = ToolAssistedGenerator::new(provider, ToolRegistry::coding_tools())
            .with_max_iterations(config.max_tool_iterations);

        Ok(Self::new(config.sequencer_config()?, Box::new(generator))
            .persist_artifact(config.persist_artifact))
    }

    pub fn persist_artifact(mut self, enabled: bool) -> Self {
        self.persist_artifact = enabled;
        self
    }

    pub fn with_storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn state(&self) -> &SequencerState {
        self.sequencer.state()
    }

    /// Generate, persist and run code for `instruction`
    pub async fn run(&mut self, instruction: &str) -> Result<TaskReport, AgentError> {
        self.abandon_unfinished()?;

        let working_dir = std::env::current_dir()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|_| ".".to_string());
        let session = SessionState::new(instruction, working_dir);

        info!(session_id = %session.id, instruction, "starting task");
        self.drive(session).await
    }

    /// Continue the last failed task from the step that failed
    pub async fn retry(&mut self) -> Result<TaskReport, AgentError> {
        let session = self.unfinished.take().ok_or_else(|| {
            AgentError::InvalidTransition("no failed task to retry".to_string())
        })?;

        self.sequencer.restore(session.sequencer.clone())?;

        info!(session_id = %session.id, state = %session.sequencer, "retrying task");
        self.drive(session).await
    }

    /// Continue a saved session from where its sequencer stopped
    pub async fn resume(&mut self, session_id: &str) -> Result<TaskReport, AgentError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AgentError::Config("session storage not configured".to_string()))?;

        let session = storage
            .load(session_id)
            .await
            .map_err(|e| AgentError::Storage(e.to_string()))?
            .ok_or_else(|| AgentError::Storage(format!("session not found: {}", session_id)))?;

        if !session.can_resume() {
            return Err(AgentError::InvalidTransition(format!(
                "session cannot be resumed (status: {})",
                session.status
            )));
        }

        self.abandon_unfinished()?;
        self.sequencer.restore(session.sequencer.clone())?;

        info!(session_id = %session.id, state = %session.sequencer, "resuming session");
        self.drive(session).await
    }

    /// Standalone file read. Does not affect a task in progress.
    pub async fn read_file(&self, path: impl Into<PathBuf>) -> Result<StepResult, AgentError> {
        self.sequencer.read_file(path, self.generator.as_ref()).await
    }

    fn abandon_unfinished(&mut self) -> Result<(), AgentError> {
        if let Some(session) = self.unfinished.take() {
            warn!(session_id = %session.id, state = %session.sequencer, "abandoning failed task");
        }
        self.sequencer.restore(SequencerState::Idle)
    }

    async fn drive(&mut self, mut session: SessionState) -> Result<TaskReport, AgentError> {
        match self.drive_steps(&mut session).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(session_id = %session.id, error = %e, "task failed");
                session.set_error(e.to_string());
                if let Err(save_err) = self.save(&session).await {
                    warn!(error = %save_err, "failed to record session failure");
                }
                self.unfinished = Some(session);
                Err(e)
            }
        }
    }

    async fn drive_steps(&mut self, session: &mut SessionState) -> Result<TaskReport, AgentError> {
        session.error = None;
        session.set_status(SessionStatus::InProgress);
        self.save(session).await?;

        // An earlier run may have stopped between generating and writing
        self.write_pending_artifact(session).await?;

        while !self.sequencer.is_idle() || session.results.is_empty() {
            let message = session
                .last_result()
                .map(|r| r.content().to_string())
                .unwrap_or_else(|| session.instruction.clone());

            let result = self.sequencer.step(&message, self.generator.as_ref()).await?;

            info!(
                session_id = %session.id,
                step = %result.step(),
                next = %self.sequencer.state(),
                "step completed"
            );
            if result.extraction_missed() {
                warn!(session_id = %session.id, "no code extracted, artifact not written");
            }

            // Committed before the write so a failed write resumes at the write
            session.record(result, self.sequencer.state().clone());
            self.save(session).await?;

            self.write_pending_artifact(session).await?;
        }

        session.complete();
        self.save(session).await?;

        Ok(TaskReport {
            session_id: session.id.clone(),
            generated: last_result_of(session, StepKind::GenerateCode)?,
            execution: last_result_of(session, StepKind::RunCode)?,
            artifact: session.artifact.clone(),
        })
    }

    /// Write the extracted code verbatim if it has not been written yet
    async fn write_pending_artifact(&self, session: &mut SessionState) -> Result<(), AgentError> {
        if !self.persist_artifact {
            return Ok(());
        }
        let Some((path, code)) = session
            .unwritten_code()
            .and_then(|r| r.next_path().map(|p| (p.to_path_buf(), r.content().to_string())))
        else {
            return Ok(());
        };

        let tool = WriteFileTool;
        tool.execute(json!({
            "path": path.to_string_lossy(),
            "content": code,
        }))
        .await
        .map_err(|e| AgentError::Tool {
            tool_name: tool.name().to_string(),
            message: e.to_string(),
        })?;

        info!(path = %path.display(), bytes = code.len(), "wrote artifact");
        session.artifact = Some(path);
        self.save(session).await
    }

    async fn save(&self, session: &SessionState) -> Result<(), AgentError> {
        match &self.storage {
            Some(storage) => storage
                .save(session)
                .await
                .map_err(|e| AgentError::Storage(e.to_string())),
            None => Ok(()),
        }
    }
}

fn last_result_of(session: &SessionState, kind: StepKind) -> Result<StepResult, AgentError> {
    session
        .results
        .iter()
        .rev()
        .find(|r| r.step() == kind)
        .cloned()
        .ok_or_else(|| {
            AgentError::InvalidTransition(format!("task finished without a {} result", kind))
        })
}
