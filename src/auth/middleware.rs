use crate::auth::extractors::resolve_identity;
use crate::auth::identity::IdentityResolver;
use crate::error::StockroomError;
use axum::{extract::Request, middleware::Next, response::Response};
use std::marker::PhantomData;

/// Middleware that requires authentication for all routes it wraps
///
/// The resolved [`Identity`](crate::auth::Identity) is stored in the request
/// extensions for downstream extractors.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Router;
/// use stockroom::auth::RequireAuth;
///
/// let protected_routes = Router::new()
///     .route("/organizations", get(list_organizations))
///     .layer(axum::middleware::from_fn(RequireAuth::<MyResolver>::middleware))
///     .layer(Extension(resolver));
/// ```
pub struct RequireAuth<R: IdentityResolver> {
    _resolver: PhantomData<R>,
}

impl<R: IdentityResolver> RequireAuth<R> {
    /// Middleware function that requires authentication
    pub async fn middleware(request: Request, next: Next) -> Result<Response, StockroomError> {
        let (mut parts, body) = request.into_parts();
        let identity = resolve_identity::<R>(&mut parts).await?;
        tracing::debug!(user_id = %identity.user_id, "Request authenticated");

        Ok(next.run(Request::from_parts(parts, body)).await)
    }
}
