use super::store::SessionStore;
use super::types::SessionRecord;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::RwLock;

/// Process-local store; everything is gone on exit.
#[derive(Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn save<'a>(
        &'a self,
        record: &'a SessionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = self.records.write().await;
            let created_at = records
                .get(&record.id)
                .map_or(record.created_at, |existing| existing.created_at);
            let mut stored = record.clone();
            stored.created_at = created_at;
            records.insert(record.id.clone(), stored);
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.records.read().await.get(id).cloned()) })
    }

    fn list_sessions<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let records = self.records.read().await;
            let mut entries: Vec<&SessionRecord> = records.values().collect();
            entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
            Ok(entries.into_iter().map(|r| r.id.clone()).collect())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move { Ok(self.records.write().await.remove(id).is_some()) })
    }
}
