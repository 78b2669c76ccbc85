//! Axum integration for organization context.
//!
//! The target tenant is claimed by the `X-Organization-Id` request header and
//! verified against the membership store on every request.

mod extractors;
mod middleware;

/// Header carrying the claimed organization id.
pub const ORG_HEADER: &str = "x-organization-id";

pub use extractors::{CurrentOrg, claimed_organization};
pub use middleware::{MiddlewareFuture, RequireOrgContext, RequireRole};
