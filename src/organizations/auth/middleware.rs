//! Organization context and role middleware.
//!
//! Both middlewares must run after [`RequireAuth`](crate::auth::RequireAuth)
//! so that the caller's identity is in the request extensions.

use super::extractors::resolve_context;
use crate::organizations::error::OrganizationError;
use crate::organizations::gate::{OrgAction, RoleGate, RoleSet};
use crate::organizations::storage::{MembershipStore, OrganizationStore};
use axum::{extract::Request, middleware::Next, response::Response};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Type alias for async middleware function return type.
pub type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<Response, OrganizationError>> + Send>>;

/// Middleware that requires a verified organization context.
///
/// Resolves the `X-Organization-Id` claim against the membership store and
/// stores the resulting [`OrganizationContext`](crate::organizations::OrganizationContext)
/// in the request extensions.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Router;
/// use stockroom::organizations::RequireOrgContext;
///
/// let org_routes = Router::new()
///     .route("/items", get(list_items))
///     .route_layer(axum::middleware::from_fn(RequireOrgContext::<MyStore>::middleware));
/// ```
pub struct RequireOrgContext<S> {
    _store: PhantomData<S>,
}

impl<S> RequireOrgContext<S>
where
    S: OrganizationStore + MembershipStore + Clone + 'static,
{
    /// Middleware function that requires organization context.
    pub async fn middleware(request: Request, next: Next) -> Result<Response, OrganizationError> {
        let (mut parts, body) = request.into_parts();
        resolve_context::<S>(&mut parts).await?;
        Ok(next.run(Request::from_parts(parts, body)).await)
    }
}

/// Middleware that requires the caller's role to be in an allowed set.
///
/// Resolves the organization context first, so it can be used without
/// [`RequireOrgContext`].
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::organizations::{RequireRole, RoleSet};
///
/// let admin_routes = Router::new()
///     .route("/organization/invitations", post(invite_member))
///     .route_layer(axum::middleware::from_fn(RequireRole::<MyStore>::allow(RoleSet::ADMIN)));
/// ```
pub struct RequireRole<S> {
    _store: PhantomData<S>,
}

impl<S> RequireRole<S>
where
    S: OrganizationStore + MembershipStore + Clone + 'static,
{
    /// Create a middleware function that allows `allowed` roles only.
    pub fn allow(
        allowed: RoleSet,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        move |request: Request, next: Next| {
            Box::pin(async move {
                let (mut parts, body) = request.into_parts();
                let ctx = resolve_context::<S>(&mut parts).await?;
                RoleGate::require(&ctx, allowed)?;
                Ok(next.run(Request::from_parts(parts, body)).await)
            })
        }
    }

    /// Middleware that requires the roles declared for `action`.
    pub fn action(
        action: OrgAction,
    ) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        Self::allow(action.allowed_roles())
    }

    /// Middleware that requires owner or admin.
    pub fn admin() -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        Self::allow(RoleSet::ADMIN)
    }

    /// Middleware that requires owner.
    pub fn owner() -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
        Self::allow(RoleSet::OWNER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::organizations::memory::InMemoryTenancyStore;
    use crate::organizations::types::{Member, Organization, Role};
    use crate::testing;
    use axum::{Extension, Router, middleware::from_fn, routing::get};

    async fn store() -> InMemoryTenancyStore {
        let store = InMemoryTenancyStore::new();
        store
            .insert_organization(Organization {
                id: "org_1".to_string(),
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                logo: None,
                metadata: None,
                created_at: 1,
                updated_at: 1,
            })
            .await;
        for (user_id, role) in [("u1", Role::Owner), ("u2", Role::Member)] {
            store
                .insert_member(Member {
                    organization_id: "org_1".to_string(),
                    user_id: user_id.to_string(),
                    role,
                    created_at: 1,
                    updated_at: 1,
                })
                .await;
        }
        store
    }

    fn router(store: InMemoryTenancyStore, user_id: &str) -> Router {
        Router::new()
            .route(
                "/billing",
                get(|| async { "billing" })
                    .route_layer(from_fn(RequireRole::<InMemoryTenancyStore>::owner())),
            )
            .route(
                "/members",
                get(|| async { "members" }).route_layer(from_fn(
                    RequireRole::<InMemoryTenancyStore>::action(OrgAction::ListMembers),
                )),
            )
            .layer(Extension(store))
            .layer(Extension(Identity::new(user_id, format!("{user_id}@x.com"))))
    }

    #[tokio::test]
    async fn test_owner_gate() {
        let store = store().await;

        testing::get(router(store.clone(), "u1"), "/billing")
            .org("org_1")
            .execute()
            .await
            .assert_ok();
        testing::get(router(store, "u2"), "/billing")
            .org("org_1")
            .execute()
            .await
            .assert_forbidden();
    }

    #[tokio::test]
    async fn test_action_gate_uses_declared_roles() {
        let store = store().await;

        testing::get(router(store.clone(), "u2"), "/members")
            .org("org_1")
            .execute()
            .await
            .assert_ok();
        testing::get(router(store, "u2"), "/members")
            .execute()
            .await
            .assert_bad_request();
    }
}
