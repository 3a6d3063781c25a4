mod sqlite;
mod state;
mod storage;

pub use sqlite::SqliteStorage;
pub use state::{SessionState, SessionStatus, SessionSummary};
pub use storage::Storage;
