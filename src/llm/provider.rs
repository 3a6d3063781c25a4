use anyhow::Result;
use async_trait::async_trait;

use super::{Message, ToolCall};
use crate::tools::Tool;

/// Response from an LLM
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The assistant message
    pub message: Message,
    /// Tool calls requested by the model, empty when it is done
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// A plain text response with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            tool_calls: Vec::new(),
        }
    }
}

/// Trait for chat-style LLM backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation so far and get the next assistant turn
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[&dyn Tool],
    ) -> Result<LlmResponse>;

    /// Get the provider name
    fn name(&self) -> &str;
}
