/// Errors surfaced by the agent to its callers.
///
/// A missing code block in a generation response is deliberately not an
/// error: see [`StepResult::extraction_missed`](crate::StepResult::extraction_missed).
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The generation service failed. The inner error is passed through as-is.
    #[error(transparent)]
    Upstream(anyhow::Error),

    #[error("tool error: {tool_name}: {message}")]
    Tool { tool_name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
