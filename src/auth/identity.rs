use crate::error::Result;
use async_trait::async_trait;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

/// A verified caller.
///
/// Only an [`IdentityResolver`] produces one. Handlers never build an
/// `Identity` from client-supplied ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Turns request credentials into a verified [`Identity`].
///
/// Implement this for whatever holds your sessions. The resolver is looked up
/// from the request extensions by the auth extractors and middleware, so add
/// it with `Extension(resolver)`.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::auth::{Identity, IdentityResolver};
///
/// #[derive(Clone)]
/// struct HeaderResolver;
///
/// #[async_trait]
/// impl IdentityResolver for HeaderResolver {
///     async fn resolve(&self, parts: &Parts) -> Result<Identity> {
///         let token = TokenExtractor::from_header(parts)?;
///         lookup_session(&token).await
///     }
/// }
/// ```
#[async_trait]
pub trait IdentityResolver: Send + Sync + Clone + 'static {
    /// Resolve the caller or fail with an unauthorized error.
    async fn resolve(&self, parts: &Parts) -> Result<Identity>;
}
