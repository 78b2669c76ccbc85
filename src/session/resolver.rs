//! Session-backed identity resolution.

use super::config::SessionConfig;
use crate::auth::{Identity, IdentityResolver, TokenExtractor};
use crate::error::{Result, StockroomError};
use crate::traits::session::{SessionData, SessionStore};
use async_trait::async_trait;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::sync::Arc;

const TOKEN_BYTES: usize = 32;
const LOGIN_REQUIRED: &str = "Please log in to continue";

/// Resolves callers from an opaque session token.
///
/// The token is read from the configured session cookie, falling back to an
/// `Authorization: Bearer` header. Every failure (no token, unknown or
/// expired session, incomplete session) produces the same unauthorized
/// error so clients learn nothing about why.
///
/// # Example
///
/// ```rust
/// use stockroom::auth::Identity;
/// use stockroom::session::{InMemorySessionStore, SessionConfig, SessionIdentityResolver};
///
/// # async fn run() -> stockroom::Result<()> {
/// let resolver = SessionIdentityResolver::new(InMemorySessionStore::new(), SessionConfig::default());
/// let token = resolver.issue(&Identity::new("u1", "alice@example.com")).await?;
/// assert!(!token.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct SessionIdentityResolver<S: SessionStore> {
    store: Arc<S>,
    config: SessionConfig,
}

impl<S: SessionStore> Clone for SessionIdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: SessionStore> SessionIdentityResolver<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a session for a verified identity and return its token.
    pub async fn issue(&self, identity: &Identity) -> Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let session = SessionData::for_identity(identity, self.config.default_ttl());
        self.store.save(&token, session).await?;
        tracing::debug!(user_id = %identity.user_id, "Session issued");
        Ok(token)
    }

    /// End a session.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.store.delete(token).await
    }

    fn token(&self, parts: &Parts) -> Option<String> {
        TokenExtractor::from_cookie(parts, &self.config.cookie_name)
            .or_else(|_| TokenExtractor::from_header(parts))
            .ok()
    }
}

#[async_trait]
impl<S: SessionStore + 'static> IdentityResolver for SessionIdentityResolver<S> {
    async fn resolve(&self, parts: &Parts) -> Result<Identity> {
        let token = self
            .token(parts)
            .ok_or_else(|| StockroomError::unauthorized(LOGIN_REQUIRED))?;

        let session = self.store.load(&token).await?.ok_or_else(|| {
            tracing::debug!("Unknown or expired session");
            StockroomError::unauthorized(LOGIN_REQUIRED)
        })?;

        if session.is_expired() {
            return Err(StockroomError::unauthorized(LOGIN_REQUIRED));
        }

        session.identity().ok_or_else(|| {
            tracing::debug!("Session carries no identity");
            StockroomError::unauthorized(LOGIN_REQUIRED)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use axum::http::Request;
    use std::time::Duration;

    fn resolver() -> SessionIdentityResolver<InMemorySessionStore> {
        SessionIdentityResolver::new(InMemorySessionStore::new(), SessionConfig::default())
    }

    fn parts_with(name: &str, value: &str) -> Parts {
        Request::builder()
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_resolves_from_bearer_and_cookie() {
        let resolver = resolver();
        let alice = Identity::new("u1", "alice@example.com");
        let token = resolver.issue(&alice).await.unwrap();

        let bearer = parts_with("authorization", &format!("Bearer {token}"));
        assert_eq!(resolver.resolve(&bearer).await.unwrap(), alice);

        let cookie = parts_with("cookie", &format!("stockroom_session={token}"));
        assert_eq!(resolver.resolve(&cookie).await.unwrap(), alice);
    }

    #[tokio::test]
    async fn test_tokens_are_unique_and_url_safe() {
        let resolver = resolver();
        let alice = Identity::new("u1", "alice@example.com");
        let a = resolver.issue(&alice).await.unwrap();
        let b = resolver.issue(&alice).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_failures_share_one_message() {
        let resolver = resolver();

        let missing = Request::builder().body(()).unwrap().into_parts().0;
        let unknown = parts_with("authorization", "Bearer nope");

        for parts in [missing, unknown] {
            let err = resolver.resolve(&parts).await.unwrap_err();
            assert!(matches!(&err, StockroomError::Unauthorized(msg) if msg == LOGIN_REQUIRED));
        }
    }

    #[tokio::test]
    async fn test_revoked_and_expired_sessions_are_rejected() {
        let store = InMemorySessionStore::new();
        let resolver = SessionIdentityResolver::new(store.clone(), SessionConfig::default());
        let token = resolver
            .issue(&Identity::new("u1", "alice@example.com"))
            .await
            .unwrap();
        resolver.revoke(&token).await.unwrap();
        let parts = parts_with("authorization", &format!("Bearer {token}"));
        assert!(resolver.resolve(&parts).await.is_err());

        let short = SessionData::for_identity(
            &Identity::new("u2", "bob@example.com"),
            Duration::from_millis(5),
        );
        store.save("short", short).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        let parts = parts_with("authorization", "Bearer short");
        assert!(resolver.resolve(&parts).await.is_err());
    }
}
