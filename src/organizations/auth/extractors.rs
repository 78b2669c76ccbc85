//! Axum extractors for organization context.

use super::ORG_HEADER;
use crate::auth::Identity;
use crate::error::StockroomError;
use crate::organizations::context::{OrganizationContext, OrganizationContextResolver};
use crate::organizations::error::OrganizationError;
use crate::organizations::storage::{MembershipStore, OrganizationStore};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::future::Future;
use std::marker::PhantomData;

/// The organization claimed by the request, if any.
///
/// This is an untrusted claim until it has been checked against the
/// membership store.
pub fn claimed_organization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(ORG_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Resolve the organization context for this request, once.
///
/// The caller's [`Identity`] must already be in the request extensions,
/// placed there by [`RequireAuth`](crate::auth::RequireAuth) or an
/// [`AuthUser`](crate::auth::AuthUser) extractor. A resolved context is cached
/// in the extensions and reused by later extractors and middleware.
pub(crate) async fn resolve_context<S>(
    parts: &mut Parts,
) -> Result<OrganizationContext, OrganizationError>
where
    S: OrganizationStore + MembershipStore + Clone + 'static,
{
    if let Some(ctx) = parts.extensions.get::<OrganizationContext>() {
        return Ok(ctx.clone());
    }

    let store = parts.extensions.get::<S>().cloned().ok_or_else(|| {
        OrganizationError::Storage(StockroomError::internal(
            "Tenancy store not found in request extensions",
        ))
    })?;

    let ctx = OrganizationContextResolver::new(store)
        .resolve(
            parts.extensions.get::<Identity>(),
            claimed_organization(parts),
        )
        .await?;

    parts.extensions.insert(ctx.clone());
    Ok(ctx)
}

/// Extract the verified organization context.
///
/// Requires the tenancy store `S` in request extensions and an authenticated
/// identity. Rejects with `Unauthenticated`, `OrganizationContextRequired`
/// or `AccessDenied`.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::organizations::CurrentOrg;
///
/// async fn list_items(CurrentOrg(ctx, _): CurrentOrg<MyStore>) -> Json<Vec<Item>> {
///     Json(items.for_organization(&ctx.organization_id).await)
/// }
/// ```
pub struct CurrentOrg<S>(pub OrganizationContext, pub PhantomData<S>);

impl<S> CurrentOrg<S> {
    /// Get a reference to the context.
    pub fn context(&self) -> &OrganizationContext {
        &self.0
    }

    /// Consume the extractor and return the context.
    pub fn into_inner(self) -> OrganizationContext {
        self.0
    }
}

impl<S, St> FromRequestParts<St> for CurrentOrg<S>
where
    S: OrganizationStore + MembershipStore + Clone + 'static,
    St: Send + Sync,
{
    type Rejection = OrganizationError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &St,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            let ctx = resolve_context::<S>(parts).await?;
            Ok(CurrentOrg(ctx, PhantomData))
        })
    }
}
