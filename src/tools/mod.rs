//! Capabilities the model can invoke through the generation service.

mod command;
mod file;
mod registry;

pub use command::RunCommandTool;
pub use file::{ReadFileTool, WriteFileTool, validate_path};
pub use registry::ToolRegistry;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A tool that can be executed on behalf of the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name the model calls this tool by
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    async fn execute(&self, params: Value) -> Result<String>;
}
