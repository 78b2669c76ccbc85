use crate::auth::identity::{Identity, IdentityResolver};
use crate::error::StockroomError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;
use std::marker::PhantomData;

/// Resolve the caller, reusing an identity already resolved for this request.
pub(crate) async fn resolve_identity<R: IdentityResolver>(
    parts: &mut Parts,
) -> Result<Identity, StockroomError> {
    if let Some(identity) = parts.extensions.get::<Identity>() {
        return Ok(identity.clone());
    }

    let resolver = parts
        .extensions
        .get::<R>()
        .ok_or_else(|| StockroomError::internal("Identity resolver not found in request extensions"))?
        .clone();

    let identity = resolver.resolve(parts).await?;
    parts.extensions.insert(identity.clone());
    Ok(identity)
}

/// Axum extractor for authenticated users
///
/// The request will be rejected with 401 if no verified identity can be
/// resolved.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(user: AuthUser<SessionIdentityResolver<InMemorySessionStore>>) -> String {
///     user.identity().email.clone()
/// }
/// ```
pub struct AuthUser<R: IdentityResolver>(pub Identity, PhantomData<R>);

impl<R: IdentityResolver> AuthUser<R> {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl<R, S> FromRequestParts<S> for AuthUser<R>
where
    R: IdentityResolver,
    S: Send + Sync,
{
    type Rejection = StockroomError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            let identity = resolve_identity::<R>(parts).await?;
            Ok(AuthUser(identity, PhantomData))
        })
    }
}

/// Axum extractor for optional authentication
///
/// Yields `None` instead of rejecting. Never use it to gate an
/// organization-scoped operation.
pub struct OptionalAuth<R: IdentityResolver>(pub Option<Identity>, PhantomData<R>);

impl<R, S> FromRequestParts<S> for OptionalAuth<R>
where
    R: IdentityResolver,
    S: Send + Sync,
{
    type Rejection = StockroomError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            if parts.extensions.get::<R>().is_none() && parts.extensions.get::<Identity>().is_none()
            {
                return Ok(OptionalAuth(None, PhantomData));
            }

            match resolve_identity::<R>(parts).await {
                Ok(identity) => Ok(OptionalAuth(Some(identity), PhantomData)),
                Err(e) => {
                    tracing::debug!(error = %e, "Optional authentication failed");
                    Ok(OptionalAuth(None, PhantomData))
                }
            }
        })
    }
}
