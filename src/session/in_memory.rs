use crate::error::Result;
use crate::traits::session::{SessionData, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory session store implementation
///
/// Sessions are lost on restart and not shared across instances.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>> {
        let session = self.sessions.read().await.get(session_id).cloned();

        match session {
            Some(session) if session.is_expired() => {
                self.sessions.write().await.remove(session_id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session_id: &str, data: SessionData) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), data);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        let initial_len = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(initial_len - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_load_save() {
        let store = InMemorySessionStore::new();
        let mut session_data = SessionData::new(Duration::from_secs(3600));
        session_data.set("user_id".to_string(), "123".to_string());

        store.save("session-1", session_data).await.unwrap();

        let loaded = store.load("session-1").await.unwrap().unwrap();
        assert_eq!(loaded.get("user_id"), Some(&"123".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySessionStore::new();
        store
            .save("session-1", SessionData::new(Duration::from_secs(3600)))
            .await
            .unwrap();
        store.delete("session-1").await.unwrap();

        assert!(store.load("session-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_dropped() {
        let store = InMemorySessionStore::new();
        store
            .save("expired", SessionData::new(Duration::from_millis(10)))
            .await
            .unwrap();
        store
            .save("valid", SessionData::new(Duration::from_secs(3600)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert!(store.load("expired").await.unwrap().is_none());
        assert!(store.load("valid").await.unwrap().is_some());
    }
}
