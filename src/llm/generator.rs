use anyhow::Result;
use async_trait::async_trait;

/// The text generation service: one prompt in, one response out.
///
/// Implementations may do any amount of work behind a call (including tool
/// round-trips), but callers see exactly one await per prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String>;
}
