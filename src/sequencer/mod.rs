//! Task sequencer: decides which step runs next, formats its prompt, awaits
//! the generation service once and advances state.
//!
//! The automatic chain is `Idle -> GenerateCode -> RunCode -> Idle`.
//! `ReadFile` is a standalone leaf reached only through
//! [`Sequencer::read_file`].

mod extract;
pub mod prompts;
mod state;

pub use extract::CodeFence;
pub use state::{SequencerState, Step, StepKind, StepResult};

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::llm::Generator;

/// Upper bound on transitions per [`Sequencer::step`] call, one per step kind
const MAX_TRANSITIONS: usize = 3;

pub const DEFAULT_ARTIFACT_PATH: &str = "generated_code.py";
pub const DEFAULT_INTERPRETER: &str = "python";

/// Parameters the sequencer needs to build prompts and pick paths
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Matcher for the code block in generation responses
    pub fence: CodeFence,
    /// Where the generated code is written and run from
    pub artifact_path: PathBuf,
    /// Command used to run the artifact, followed by its path
    pub interpreter: String,
}

impl SequencerConfig {
    /// Full command line for running `path`
    pub fn run_command(&self, path: &Path) -> String {
        format!("{} {}", self.interpreter, path.display())
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            fence: CodeFence::python(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            interpreter: DEFAULT_INTERPRETER.to_string(),
        }
    }
}

/// What a single call to [`advance`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State moved but no step ran yet; call again with the same message
    Pending,
    Produced(StepResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SequencerState,
    pub outcome: Outcome,
}

/// Run one transition from `state`.
///
/// Calls the generator at most once. A generator failure is returned as
/// [`AgentError::Upstream`] without retry; since `state` is borrowed, the
/// caller's state is unchanged in that case.
pub async fn advance(
    state: &SequencerState,
    message: &str,
    generator: &dyn Generator,
    config: &SequencerConfig,
) -> Result<Transition, AgentError> {
    let step = match state {
        SequencerState::Idle => {
            debug!("idle, treating message as a coding instruction");
            return Ok(Transition {
                next: SequencerState::Active(Step::GenerateCode),
                outcome: Outcome::Pending,
            });
        }
        SequencerState::Active(step) => step,
    };

    info!(step = %step.kind(), "running step");

    match step {
        Step::GenerateCode => {
            let prompt = prompts::generate_code(message, config.fence.language());
            let response = generator.ask(&prompt).await.map_err(AgentError::Upstream)?;

            let code = config.fence.extract(&response);
            if code.is_none() {
                warn!(
                    language = config.fence.language(),
                    response_len = response.len(),
                    "no code block found in generation response"
                );
            }

            let path = config.artifact_path.clone();
            Ok(Transition {
                next: SequencerState::Active(Step::RunCode { path: path.clone() }),
                outcome: Outcome::Produced(StepResult::generated(code, path)),
            })
        }
        Step::RunCode { path } => {
            let prompt = prompts::run_code(path, &config.run_command(path));
            let response = generator.ask(&prompt).await.map_err(AgentError::Upstream)?;

            Ok(Transition {
                next: SequencerState::Idle,
                outcome: Outcome::Produced(StepResult::response(StepKind::RunCode, response)),
            })
        }
        Step::ReadFile { path } => {
            let prompt = prompts::read_file(path);
            let response = generator.ask(&prompt).await.map_err(AgentError::Upstream)?;

            Ok(Transition {
                next: SequencerState::Idle,
                outcome: Outcome::Produced(StepResult::response(StepKind::ReadFile, response)),
            })
        }
    }
}

/// Owner of a [`SequencerState`]; the only thing that mutates it.
///
/// Methods that advance the chain take `&mut self`, so one sequencer never
/// runs two steps at once. A caller that drops an in-flight future must not
/// reuse the sequencer.
#[derive(Debug, Default)]
pub struct Sequencer {
    state: SequencerState,
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            state: SequencerState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Put the sequencer back into a previously saved chain state.
    ///
    /// `ReadFile` is never part of the chain, so it cannot be restored.
    pub fn restore(&mut self, state: SequencerState) -> Result<(), AgentError> {
        if let SequencerState::Active(Step::ReadFile { .. }) = state {
            return Err(AgentError::InvalidTransition(
                "read_file is a standalone step and cannot be restored into the chain".to_string(),
            ));
        }
        self.state = state;
        Ok(())
    }

    /// Advance the chain until a step produces a result.
    ///
    /// From idle this runs `GenerateCode` in the same call and leaves the
    /// state at `RunCode`. State is only committed once a result exists.
    pub async fn step(
        &mut self,
        message: &str,
        generator: &dyn Generator,
    ) -> Result<StepResult, AgentError> {
        let mut state = self.state.clone();

        for _ in 0..MAX_TRANSITIONS {
            let transition = advance(&state, message, generator, &self.config).await?;
            debug!(from = %state, to = %transition.next, "transition");
            state = transition.next;

            if let Outcome::Produced(result) = transition.outcome {
                self.state = state;
                return Ok(result);
            }
        }

        Err(AgentError::InvalidTransition(format!(
            "no step produced a result after {} transitions (stuck at {})",
            MAX_TRANSITIONS, state
        )))
    }

    /// Run a standalone `ReadFile` step. The chain state is not touched.
    pub async fn read_file(
        &self,
        path: impl Into<PathBuf>,
        generator: &dyn Generator,
    ) -> Result<StepResult, AgentError> {
        let state = SequencerState::Active(Step::ReadFile { path: path.into() });
        let transition = advance(&state, "", generator, &self.config).await?;

        match transition.outcome {
            Outcome::Produced(result) => Ok(result),
            Outcome::Pending => Err(AgentError::InvalidTransition(
                "read_file produced no result".to_string(),
            )),
        }
    }
}
