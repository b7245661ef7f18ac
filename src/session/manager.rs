use super::store::SessionStore;
use super::types::{SessionRecord, WorkflowKind};
use crate::error::SessionError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Session access with one in-flight request per session id.
///
/// Callers take [`SessionManager::lock`] for the whole load → run → save
/// cycle; requests for other sessions proceed in parallel.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    locks: Arc<LockMap>,
}

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive use of one session id. Releasing the last holder or waiter
/// drops the id's lock entry.
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: String,
    locks: Arc<LockMap>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // waiters clone the entry under this map lock, so a count of one
        // means nobody else holds or awaits it
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

fn storage(error: &anyhow::Error) -> SessionError {
    SessionError::Storage(format!("{error:#}"))
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wait for exclusive use of `id`.
    pub async fn lock(&self, id: &str) -> SessionGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(id.to_owned())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            id: id.to_owned(),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub async fn load(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        self.store.load(id).await.map_err(|e| storage(&e))
    }

    /// Load `id`, insisting it exists and belongs to `kind`.
    pub async fn require(&self, id: &str, kind: WorkflowKind) -> Result<SessionRecord, SessionError> {
        let record = self
            .load(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        check_kind(&record, kind)?;
        Ok(record)
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        self.store.save(record).await.map_err(|e| storage(&e))?;
        tracing::debug!(session_id = %record.id, kind = %record.kind, "session saved");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>, SessionError> {
        self.store.list_sessions().await.map_err(|e| storage(&e))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        self.store.delete(id).await.map_err(|e| storage(&e))
    }

    /// Access the underlying store.
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }
}

pub fn check_kind(record: &SessionRecord, kind: WorkflowKind) -> Result<(), SessionError> {
    if record.kind == kind {
        Ok(())
    } else {
        Err(SessionError::WorkflowMismatch {
            id: record.id.clone(),
            expected: kind.to_string(),
            actual: record.kind.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::InMemorySessionStore;
    use serde_json::json;
    use std::time::Duration;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemorySessionStore::new()))
    }

    #[tokio::test]
    async fn require_checks_existence_and_kind() {
        let manager = manager();
        assert!(matches!(
            manager.require("nope", WorkflowKind::Chatbot).await,
            Err(SessionError::NotFound(_))
        ));

        manager
            .save(&SessionRecord::new("s1", WorkflowKind::Stocks, json!({})))
            .await
            .unwrap();
        assert!(manager.require("s1", WorkflowKind::Stocks).await.is_ok());
        assert!(matches!(
            manager.require("s1", WorkflowKind::Chatbot).await,
            Err(SessionError::WorkflowMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn same_session_requests_are_serialized() {
        let manager = Arc::new(manager());
        let guard = manager.lock("s1").await;

        let contender = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let _guard = manager.lock("s1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!contender.is_finished());

        // a different session is not blocked
        tokio::time::timeout(Duration::from_secs(1), manager.lock("s2"))
            .await
            .unwrap();

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn released_locks_are_forgotten() {
        let manager = manager();
        for n in 0..100 {
            let _guard = manager.lock(&format!("s{n}")).await;
        }
        assert_eq!(manager.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn lock_entry_outlives_release_while_contended() {
        let manager = Arc::new(manager());
        let guard = manager.lock("s1").await;
        let contender = {
            let manager = manager.clone();
            tokio::spawn(async move {
                let _guard = manager.lock("s1").await;
                tokio::time::sleep(Duration::from_millis(30)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        drop(guard);
        assert_eq!(manager.tracked_locks(), 1);

        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manager.tracked_locks(), 0);
    }
}
