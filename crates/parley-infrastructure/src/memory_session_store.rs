//! In-memory SessionStore implementation.

use async_trait::async_trait;
use parley_core::error::Result;
use parley_core::session::{RecordKey, SessionId, SessionStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local session store.
///
/// Values are cloned in and out, so callers never share a record with the
/// store. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<SessionId, HashMap<RecordKey, Value>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &SessionId, key: RecordKey) -> Result<Option<Value>> {
        let records = self.records.read().await;
        Ok(records
            .get(session_id)
            .and_then(|session| session.get(&key))
            .cloned())
    }

    async fn put(&self, session_id: &SessionId, key: RecordKey, value: Value) -> Result<()> {
        let mut records = self.records.write().await;
        records
            .entry(session_id.clone())
            .or_default()
            .insert(key, value);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let records = self.records.read().await;
        let mut ids: Vec<String> = records.keys().map(|id| id.as_str().to_string()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_your_writes() {
        let store = InMemorySessionStore::new();
        let id = SessionId::new("s1").unwrap();

        assert!(store.get(&id, RecordKey::Analytics).await.unwrap().is_none());

        store.put(&id, RecordKey::Analytics, json!({"totalMessages": 3})).await.unwrap();
        store.put(&id, RecordKey::Analytics, json!({"totalMessages": 4})).await.unwrap();

        let value = store.get(&id, RecordKey::Analytics).await.unwrap();
        assert_eq!(value, Some(json!({"totalMessages": 4})));
        assert!(store.get(&id, RecordKey::Messages).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemorySessionStore::new();
        let other = store.clone();
        let id = SessionId::new("shared").unwrap();

        store.put(&id, RecordKey::Messages, json!([])).await.unwrap();

        assert_eq!(other.list_sessions().await.unwrap(), vec!["shared".to_string()]);
    }
}
