//! Identity resolution.
//!
//! Produces a verified [`Identity`] from request credentials and exposes it
//! to handlers through extractors and middleware.

pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod token;

pub use extractors::{AuthUser, OptionalAuth};
pub use identity::{Identity, IdentityResolver};
pub use middleware::RequireAuth;
pub use token::TokenExtractor;
