mod coding;
mod generator;
mod runner;

pub use coding::{CodingAgent, TaskReport};
pub use generator::{DEFAULT_MAX_TOOL_ITERATIONS, ToolAssistedGenerator};
pub use runner::tool_loop;
