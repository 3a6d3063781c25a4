use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{FunctionBuilder, LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool as LlmTool};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use super::{LlmProvider, LlmResponse, Message, MessageRole, ToolCall};
use crate::tools::Tool;

const API_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_TOKENS: u32 = 8192;

/// Hosted API behind an [`ApiProvider`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Anthropic,
    OpenAI,
}

impl Backend {
    fn name(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAI => "openai",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAI => "gpt-4o",
        }
    }

    fn llm_backend(self) -> LLMBackend {
        match self {
            Self::Anthropic => LLMBackend::Anthropic,
            Self::OpenAI => LLMBackend::OpenAI,
        }
    }
}

/// Chat provider for a hosted API, built on the llm crate
pub struct ApiProvider {
    backend: Backend,
    model: String,
    api_key: String,
}

impl ApiProvider {
    /// Create a provider, reading the API key from the backend's env var
    pub fn new(backend: Backend, model: impl Into<String>) -> Result<Self> {
        let var = backend.api_key_var();
        let api_key =
            std::env::var(var).with_context(|| format!("{} environment variable not set", var))?;
        Ok(Self {
            backend,
            model: model.into(),
            api_key,
        })
    }

    pub fn anthropic(model: Option<&str>) -> Result<Self> {
        let backend = Backend::Anthropic;
        Self::new(backend, model.unwrap_or(backend.default_model()))
    }

    pub fn openai(model: Option<&str>) -> Result<Self> {
        let backend = Backend::OpenAI;
        Self::new(backend, model.unwrap_or(backend.default_model()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Create a provider by name ("anthropic" or "openai")
pub fn create_provider(name: &str, model: Option<&str>) -> Result<Box<dyn LlmProvider>> {
    let provider = match name {
        "anthropic" => ApiProvider::anthropic(model)?,
        "openai" => ApiProvider::openai(model)?,
        _ => anyhow::bail!("unknown provider: {}", name),
    };
    debug!(provider = name, model = provider.model(), "created provider");
    Ok(Box::new(provider))
}

#[async_trait]
impl LlmProvider for ApiProvider {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[&dyn Tool],
    ) -> Result<LlmResponse> {
        let llm_tools: Vec<LlmTool> = tools
            .iter()
            .map(|t| LlmTool {
                tool_type: "function".to_string(),
                function: FunctionTool {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.schema(),
                },
                cache_control: None,
            })
            .collect();

        // The llm crate binds functions at build time, so the client is rebuilt per call.
        let mut builder = LLMBuilder::new()
            .backend(self.backend.llm_backend())
            .api_key(&self.api_key)
            .model(&self.model)
            .system(system)
            .max_tokens(MAX_TOKENS);

        for tool in &llm_tools {
            builder = builder.function(
                FunctionBuilder::new(&tool.function.name)
                    .description(&tool.function.description)
                    .json_schema(tool.function.parameters.clone()),
            );
        }

        let client = builder.build().context("failed to build LLM client")?;
        let chat_messages = to_chat_messages(messages);
        let api = self.backend.name();

        let response = if llm_tools.is_empty() {
            timeout(API_TIMEOUT, client.chat(&chat_messages))
                .await
                .with_context(|| format!("{} API call timed out after 120 seconds", api))?
                .with_context(|| format!("failed to call {} API", api))?
        } else {
            timeout(
                API_TIMEOUT,
                client.chat_with_tools(&chat_messages, Some(&llm_tools)),
            )
            .await
            .with_context(|| format!("{} API call timed out after 120 seconds", api))?
            .with_context(|| format!("failed to call {} API with tools", api))?
        };

        let content = response.text().unwrap_or_else(|| {
            warn!(provider = api, "API returned empty or missing response text");
            String::new()
        });

        let tool_calls = response
            .tool_calls()
            .map(|calls| {
                calls
                    .iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: serde_json::from_str(&tc.function.arguments).unwrap_or_else(
                            |e| {
                                warn!(error = %e, "failed to parse tool call arguments as JSON");
                                serde_json::Value::Null
                            },
                        ),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            message: Message::assistant(content),
            tool_calls,
        })
    }
}

fn to_llm_tool_call(id: &str, name: &str, arguments: String) -> llm::ToolCall {
    llm::ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: llm::FunctionCall {
            name: name.to_string(),
            arguments,
        },
    }
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|msg| match msg.role {
            MessageRole::User => Some(ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::Text,
                content: msg.content.clone(),
            }),
            MessageRole::Assistant if msg.tool_calls.is_empty() => Some(ChatMessage {
                role: ChatRole::Assistant,
                message_type: MessageType::Text,
                content: msg.content.clone(),
            }),
            MessageRole::Assistant => {
                let calls = msg
                    .tool_calls
                    .iter()
                    .map(|tc| to_llm_tool_call(&tc.id, &tc.name, tc.arguments.to_string()))
                    .collect();
                Some(ChatMessage {
                    role: ChatRole::Assistant,
                    message_type: MessageType::ToolUse(calls),
                    content: msg.content.clone(),
                })
            }
            // Results travel as a user turn; the name is not needed by either API
            MessageRole::Tool => msg.tool_result.as_ref().map(|result| ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::ToolResult(vec![to_llm_tool_call(
                    &result.tool_call_id,
                    "",
                    result.result.clone(),
                )]),
                content: String::new(),
            }),
        })
        .collect()
}
