use anyhow::Result;
use async_trait::async_trait;

use super::{SessionState, SessionSummary};

/// Storage backend for sessions
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or replace a session
    async fn save(&self, session: &SessionState) -> Result<()>;

    async fn load(&self, id: &str) -> Result<Option<SessionState>>;

    /// All sessions, most recently updated first
    async fn list(&self) -> Result<Vec<SessionSummary>>;

    async fn delete(&self, id: &str) -> Result<()>;
}
