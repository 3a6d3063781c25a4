use anyhow::Result;
use async_trait::async_trait;

use super::runner::tool_loop;
use crate::llm::{Generator, LlmProvider};
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 20;

const SYSTEM_PROMPT: &str = r#"You are a coding agent with access to tools.

Available tools:
- write_file: Write text content to a named file
- run_command: Run a command and return its output
- read_file: Read a named file's content

Use the tools when a request asks you to save, run or read something.
After receiving tool results, continue until the request is complete,
then answer with the requested content only."#;

/// Generation service backed by a chat provider and a set of tools.
///
/// Each `ask` is one user prompt; any tool round-trips the model requests
/// happen inside the call.
pub struct ToolAssistedGenerator {
    provider: Box<dyn LlmProvider>,
    tools: ToolRegistry,
    max_iterations: usize,
}

impl ToolAssistedGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            max_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[async_trait]
impl Generator for ToolAssistedGenerator {
    async fn ask(&self, prompt: &str) -> Result<String> {
        tool_loop(
            SYSTEM_PROMPT,
            prompt,
            self.provider.as_ref(),
            &self.tools,
            self.max_iterations,
        )
        .await
    }
}
