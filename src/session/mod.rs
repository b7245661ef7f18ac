pub mod manager;
pub mod memory;
pub mod store;
pub mod types;

pub use manager::{SessionGuard, SessionManager};
pub use memory::InMemorySessionStore;
pub use store::{SessionStore, SqliteSessionStore};
pub use types::{PendingConfirmation, SessionRecord, WorkflowKind, new_session_id};

use crate::config::{SessionBackend, SessionsConfig};
use std::sync::Arc;

/// Build the store selected in `[sessions]`.
pub async fn open_store(config: &SessionsConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend {
        SessionBackend::Memory => Ok(Arc::new(InMemorySessionStore::new())),
        SessionBackend::Sqlite => {
            let path = config.resolved_db_path();
            Ok(Arc::new(SqliteSessionStore::open(&path).await?))
        }
    }
}
