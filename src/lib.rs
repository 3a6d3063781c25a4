pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod sequencer;
pub mod session;
pub mod tools;

pub use agents::{CodingAgent, TaskReport, ToolAssistedGenerator};
pub use config::AgentConfig;
pub use error::AgentError;
pub use llm::{
    ApiProvider, Backend, Generator, LlmProvider, LlmResponse, Message, MessageRole, ToolCall,
    ToolResult, create_provider,
};
pub use sequencer::{
    CodeFence, Outcome, Sequencer, SequencerConfig, SequencerState, Step, StepKind, StepResult,
    Transition, advance,
};
pub use session::{SessionState, SessionStatus, SessionSummary, SqliteStorage, Storage};
pub use tools::{ReadFileTool, RunCommandTool, Tool, ToolRegistry, WriteFileTool};
