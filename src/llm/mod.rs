mod backend;
mod generator;
mod message;
mod provider;

pub use backend::{ApiProvider, Backend, create_provider};
pub use generator::Generator;
pub use message::{Message, MessageRole, ToolCall, ToolResult};
pub use provider::{LlmProvider, LlmResponse};
