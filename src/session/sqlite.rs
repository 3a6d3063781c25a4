use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::PathBuf;
use tokio::task;
use tracing::debug;

use super::{SessionState, SessionSummary, Storage};

/// SQLite-backed session storage.
///
/// Each call opens its own connection on a blocking thread; the full
/// session is stored as JSON next to a few columns used for listing.
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let storage = Self { db_path };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Storage at ~/.coding-agent/sessions.db
    pub fn default_location() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Self::new(PathBuf::from(home).join(".coding-agent").join("sessions.db"))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("failed to open database: {}", self.db_path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                instruction TEXT NOT NULL,
                status TEXT NOT NULL,
                sequencer TEXT NOT NULL,
                working_dir TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                error TEXT,
                data TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create sessions table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at)",
            [],
        )
        .context("failed to create updated_at index")?;

        debug!(path = %self.db_path.display(), "initialized SQLite storage");
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save(&self, session: &SessionState) -> Result<()> {
        let session = session.clone();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let data = serde_json::to_string(&session)?;

            conn.execute(
                "INSERT OR REPLACE INTO sessions
                 (id, instruction, status, sequencer, working_dir, created_at, updated_at, error, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    session.id,
                    session.instruction,
                    session.status.to_string(),
                    session.sequencer.to_string(),
                    session.working_dir,
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                    session.error,
                    data,
                ],
            )?;

            debug!(id = %session.id, status = %session.status, "saved session");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn load(&self, id: &str) -> Result<Option<SessionState>> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare("SELECT data FROM sessions WHERE id = ?1")?;

            match stmt.query_row([&id], |row| row.get::<_, String>(0)) {
                Ok(data) => {
                    let session: SessionState = serde_json::from_str(&data)
                        .with_context(|| format!("corrupt session data for {}", id))?;
                    debug!(id = %session.id, "loaded session");
                    Ok(Some(session))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, instruction, status, sequencer, updated_at
                 FROM sessions
                 ORDER BY updated_at DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, instruction, status, sequencer, updated_at)| {
                    Ok(SessionSummary {
                        status: status.parse()?,
                        id,
                        instruction,
                        sequencer,
                        updated_at,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute("DELETE FROM sessions WHERE id = ?1", [&id])?;
            debug!(id = %id, "deleted session");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{SequencerState, Step};
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_load_list_delete() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(dir.path().join("sessions.db")).unwrap();

        let mut session = SessionState::new("write factorial", "/tmp");
        session.sequencer = SequencerState::Active(Step::RunCode {
            path: PathBuf::from("generated_code.py"),
        });
        storage.save(&session).await.unwrap();

        let loaded = storage.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.instruction, "write factorial");
        assert_eq!(loaded.sequencer, session.sequencer);

        let listed = storage.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sequencer, "run_code:generated_code.py");

        storage.delete(&session.id).await.unwrap();
        assert!(storage.load(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new(dir.path().join("nested/sessions.db")).unwrap();
        assert!(storage.load("does-not-exist").await.unwrap().is_none());
    }
}
