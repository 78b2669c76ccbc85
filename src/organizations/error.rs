//! Organization error types.

use crate::error::StockroomError;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur during organization operations.
#[derive(Debug, Error)]
pub enum OrganizationError {
    /// No verified identity on the request.
    #[error("Please log in to continue")]
    Unauthenticated,

    /// The request did not say which organization it targets.
    #[error("Select an organization to continue (missing X-Organization-Id header)")]
    OrganizationContextRequired,

    /// The caller is not a member of the claimed organization.
    ///
    /// The message is identical whether or not the organization exists.
    #[error("Access denied")]
    AccessDenied,

    /// The caller's role is not in the operation's allowed set.
    #[error("Access denied: requires {required} role")]
    RoleRequired {
        /// Human-readable allowed role set.
        required: String,
    },

    /// Organization not found (or not visible to the caller).
    #[error("Organization not found: {org_id}")]
    NotFound {
        /// The ID that was not found.
        org_id: String,
    },

    /// Member not found in the caller's organization.
    #[error("Member not found: {user_id}")]
    MemberNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Invitation not found.
    #[error("Invitation not found: {invitation_id}")]
    InvitationNotFound {
        /// The invitation ID.
        invitation_id: String,
    },

    /// Organization slug is already taken.
    #[error("Slug already taken: {slug}")]
    SlugTaken {
        /// The slug that is taken.
        slug: String,
    },

    /// The operation would leave the organization without an owner.
    #[error("Cannot remove or demote the last owner of an organization")]
    LastOwner,

    /// The invitation is no longer pending.
    #[error("Invitation has already been {status}")]
    AlreadyProcessed {
        /// Current status of the invitation.
        status: String,
    },

    /// Invitation has expired.
    #[error("Invitation has expired")]
    InvitationExpired,

    /// User is already a member of the organization.
    #[error("User is already a member of this organization")]
    AlreadyMember,

    /// Invalid email format.
    #[error("Invalid email format: {email}")]
    InvalidEmail {
        /// The invalid email address.
        email: String,
    },

    /// Slug is not lowercase alphanumeric words joined by single hyphens.
    #[error("Invalid slug: {slug}")]
    InvalidSlug {
        /// The rejected slug.
        slug: String,
    },

    /// Organization name is empty or too long.
    #[error("Invalid organization name: {reason}")]
    InvalidName {
        /// Why the name was rejected.
        reason: String,
    },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StockroomError),
}

impl OrganizationError {
    /// Create a not found error.
    pub fn not_found(org_id: impl Into<String>) -> Self {
        Self::NotFound {
            org_id: org_id.into(),
        }
    }

    /// Create a member not found error.
    pub fn member_not_found(user_id: impl Into<String>) -> Self {
        Self::MemberNotFound {
            user_id: user_id.into(),
        }
    }

    /// Create an invitation not found error.
    pub fn invitation_not_found(invitation_id: impl Into<String>) -> Self {
        Self::InvitationNotFound {
            invitation_id: invitation_id.into(),
        }
    }

    /// Create a slug taken error.
    pub fn slug_taken(slug: impl Into<String>) -> Self {
        Self::SlugTaken { slug: slug.into() }
    }

    /// Create a role required error.
    pub fn role_required(required: impl Into<String>) -> Self {
        Self::RoleRequired {
            required: required.into(),
        }
    }

    /// Create an already processed error.
    pub fn already_processed(status: impl ToString) -> Self {
        Self::AlreadyProcessed {
            status: status.to_string(),
        }
    }

    /// Create an invalid email error.
    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    /// Create an invalid slug error.
    pub fn invalid_slug(slug: impl Into<String>) -> Self {
        Self::InvalidSlug { slug: slug.into() }
    }

    /// Create an invalid name error.
    pub fn invalid_name(reason: impl Into<String>) -> Self {
        Self::InvalidName {
            reason: reason.into(),
        }
    }
}

impl From<OrganizationError> for StockroomError {
    fn from(err: OrganizationError) -> Self {
        let message = err.to_string();
        match err {
            OrganizationError::Unauthenticated => StockroomError::Unauthorized(message),
            OrganizationError::OrganizationContextRequired
            | OrganizationError::InvalidEmail { .. }
            | OrganizationError::InvalidSlug { .. }
            | OrganizationError::InvalidName { .. } => StockroomError::BadRequest(message),
            OrganizationError::AccessDenied | OrganizationError::RoleRequired { .. } => {
                StockroomError::Forbidden(message)
            }
            OrganizationError::NotFound { .. }
            | OrganizationError::MemberNotFound { .. }
            | OrganizationError::InvitationNotFound { .. } => StockroomError::NotFound(message),
            OrganizationError::SlugTaken { .. }
            | OrganizationError::LastOwner
            | OrganizationError::AlreadyProcessed { .. }
            | OrganizationError::AlreadyMember => StockroomError::Conflict(message),
            OrganizationError::InvitationExpired => StockroomError::Gone(message),
            OrganizationError::Storage(inner) => inner,
        }
    }
}

impl IntoResponse for OrganizationError {
    fn into_response(self) -> Response {
        StockroomError::from(self).into_response()
    }
}

/// Result type for organization operations.
pub type Result<T> = std::result::Result<T, OrganizationError>;
