//! Session storage trait
//!
//! Sessions are the credential behind an [`Identity`]. The store is swappable;
//! the crate ships an in-memory implementation.

use crate::auth::Identity;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

const USER_ID_KEY: &str = "user_id";
const EMAIL_KEY: &str = "email";
const NAME_KEY: &str = "name";

/// Session data stored in the session store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Session data as key-value pairs
    pub data: HashMap<String, String>,

    pub created_at: SystemTime,

    pub expires_at: SystemTime,
}

impl SessionData {
    /// Create a new session with expiration
    pub fn new(ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            data: HashMap::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Create a session carrying a verified identity
    pub fn for_identity(identity: &Identity, ttl: Duration) -> Self {
        let mut session = Self::new(ttl);
        session.set(USER_ID_KEY.to_string(), identity.user_id.clone());
        session.set(EMAIL_KEY.to_string(), identity.email.clone());
        if let Some(name) = &identity.name {
            session.set(NAME_KEY.to_string(), name.clone());
        }
        session
    }

    /// The identity stored in this session, if complete
    pub fn identity(&self) -> Option<Identity> {
        let user_id = self.get(USER_ID_KEY).filter(|id| !id.is_empty())?;
        let email = self.get(EMAIL_KEY)?;
        Some(Identity {
            user_id: user_id.clone(),
            email: email.clone(),
            name: self.get(NAME_KEY).cloned(),
        })
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }
}

/// Session storage trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load session data by session ID
    ///
    /// Returns `Ok(None)` if the session doesn't exist or has expired.
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>>;

    async fn save(&self, session_id: &str, data: SessionData) -> Result<()>;

    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Clean up expired sessions
    async fn cleanup_expired(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_round_trip_through_session() {
        let identity = Identity::new("u1", "alice@x.com").with_name("Alice");
        let session = SessionData::for_identity(&identity, Duration::from_secs(60));
        assert_eq!(session.identity(), Some(identity));
    }

    #[test]
    fn test_incomplete_session_has_no_identity() {
        let mut session = SessionData::new(Duration::from_secs(60));
        session.set("user_id".to_string(), "u1".to_string());
        assert!(session.identity().is_none());
    }
}
