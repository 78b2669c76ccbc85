//! Organization context resolution.
//!
//! Turns a verified identity plus an untrusted organization claim into an
//! [`OrganizationContext`]. Every organization-scoped operation goes through
//! here; the claim is always cross-checked against the membership store.

use super::error::{OrganizationError, Result};
use super::storage::{MembershipStore, OrganizationStore};
use super::types::Role;
use crate::auth::Identity;
use serde::Serialize;
use tracing::{debug, instrument};

/// The verified tenant of one request.
///
/// Built fresh for every request from the live organization and membership
/// rows. Downstream code filters every tenant-scoped query by
/// `organization_id` taken from here, never from client input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrganizationContext {
    pub organization_id: String,
    pub name: String,
    pub slug: String,
    /// The caller's role in this organization.
    pub role: Role,
    /// The caller.
    pub user_id: String,
}

/// Resolves [`OrganizationContext`]s against a store.
#[derive(Clone)]
pub struct OrganizationContextResolver<S> {
    store: S,
}

impl<S> OrganizationContextResolver<S>
where
    S: OrganizationStore + MembershipStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve the context for `identity` claiming organization `claim`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when there is no identity
    /// - `OrganizationContextRequired` when the claim is missing or blank
    /// - `AccessDenied` when the caller is not a member, whether or not the
    ///   organization exists
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        identity: Option<&Identity>,
        claim: Option<&str>,
    ) -> Result<OrganizationContext> {
        let identity = identity.ok_or(OrganizationError::Unauthenticated)?;

        let organization_id = claim
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(OrganizationError::OrganizationContextRequired)?;

        let Some(member) = self
            .store
            .find_member(organization_id, &identity.user_id)
            .await?
        else {
            debug!(user_id = %identity.user_id, "No membership for claimed organization");
            return Err(OrganizationError::AccessDenied);
        };

        // Deleted between the two reads.
        let Some(organization) = self.store.find_by_id(organization_id).await? else {
            return Err(OrganizationError::AccessDenied);
        };

        debug!(
            user_id = %identity.user_id,
            org_id = %organization.id,
            role = %member.role,
            "Organization context resolved"
        );

        Ok(OrganizationContext {
            organization_id: organization.id,
            name: organization.name,
            slug: organization.slug,
            role: member.role,
            user_id: member.user_id,
        })
    }
}
