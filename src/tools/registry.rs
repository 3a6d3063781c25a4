use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ReadFileTool, RunCommandTool, Tool, WriteFileTool};

/// Named set of tools offered to the model
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// The three tools the coding steps rely on: write, run and read
    pub fn coding_tools() -> Self {
        let mut registry = Self::new();
        registry.register(WriteFileTool);
        registry.register(RunCommandTool::default());
        registry.register(ReadFileTool);
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tools, ordered by name
    pub fn all(&self) -> Vec<&dyn Tool> {
        self.tools.values().map(|t| t.as_ref()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
