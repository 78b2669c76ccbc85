//! A fully wired in-memory tenancy app for endpoint tests.

use super::mailer::RecordingMailer;
use crate::auth::Identity;
use crate::organizations::{
    InMemoryTenancyStore, InvitationConfig, OrganizationConfig, TenancyServices, routes,
};
use crate::session::{InMemorySessionStore, SessionConfig, SessionIdentityResolver};
use axum::Router;
use std::sync::Arc;

/// The tenancy router over in-memory stores, with handles for assertions.
///
/// # Example
///
/// ```rust,ignore
/// let app = TestApp::new();
/// let alice = app.login("alice", "alice@example.com").await;
///
/// testing::post(app.router(), "/organizations")
///     .bearer_token(&alice)
///     .json_body(&json!({"name": "Acme", "slug": "acme"}))
///     .execute()
///     .await
///     .assert_created();
/// ```
#[derive(Clone)]
pub struct TestApp {
    pub store: InMemoryTenancyStore,
    pub sessions: SessionIdentityResolver<InMemorySessionStore>,
    pub mailer: RecordingMailer,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_invitations(InvitationConfig::default())
    }

    pub fn with_invitations(invitations: InvitationConfig) -> Self {
        let store = InMemoryTenancyStore::new();
        let sessions =
            SessionIdentityResolver::new(InMemorySessionStore::new(), SessionConfig::default());
        let mailer = RecordingMailer::new();

        let services = TenancyServices::new(store.clone(), OrganizationConfig::default(), invitations)
            .with_mailer(Arc::new(mailer.clone()));
        let router = routes::router(store.clone(), sessions.clone(), services);

        Self {
            store,
            sessions,
            mailer,
            router,
        }
    }

    /// A router handle for one request.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Start a session for `user_id` and return its bearer token.
    pub async fn login(&self, user_id: &str, email: &str) -> String {
        self.sessions
            .issue(&Identity::new(user_id, email))
            .await
            .unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
