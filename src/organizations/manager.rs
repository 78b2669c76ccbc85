//! Organization manager.
//!
//! Creation, lookup, update and deletion of organizations.

use super::audit::{OrgAuditEntry, OrgAuditEvent};
use super::config::OrganizationConfig;
use super::context::OrganizationContext;
use super::error::{OrganizationError, Result};
use super::storage::{
    MembershipStore, OptionalAuditStore, OrgAuditStore, OrganizationStore, WithAuditStore,
};
use super::types::{
    Member, Organization, OrganizationDetails, OrganizationPatch, OrganizationSummary, Plan,
    Role, Subscription, SubscriptionStatus,
};
use super::utils::{current_timestamp, new_id, validate_name, validate_slug};
use tracing::{debug, info, instrument};

/// Organization manager, generic over store implementations.
///
/// Update and delete perform no authorization of their own: callers gate
/// them with [`RoleGate`](super::RoleGate) first.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::organizations::{InMemoryTenancyStore, OrganizationConfig, OrganizationManager};
///
/// let store = InMemoryTenancyStore::new();
/// let manager = OrganizationManager::new(store.clone(), store.clone(), OrganizationConfig::default())
///     .with_audit_store(store);
///
/// let org = manager.create_organization("user_1", "Acme", "acme").await?;
/// ```
pub struct OrganizationManager<O, M, A = ()>
where
    O: OrganizationStore,
    M: MembershipStore,
    A: OptionalAuditStore,
{
    org_store: O,
    membership_store: M,
    audit_store: A,
    config: OrganizationConfig,
}

impl<O, M> OrganizationManager<O, M, ()>
where
    O: OrganizationStore,
    M: MembershipStore,
{
    /// Create a new organization manager.
    #[must_use]
    pub fn new(org_store: O, membership_store: M, config: OrganizationConfig) -> Self {
        Self {
            org_store,
            membership_store,
            audit_store: (),
            config,
        }
    }

    /// Enable audit logging with the given store.
    pub fn with_audit_store<AuditStore: OrgAuditStore + Clone + 'static>(
        self,
        audit_store: AuditStore,
    ) -> OrganizationManager<O, M, WithAuditStore<AuditStore>> {
        OrganizationManager {
            org_store: self.org_store,
            membership_store: self.membership_store,
            audit_store: WithAuditStore(audit_store),
            config: self.config,
        }
    }
}

impl<O, M, A> OrganizationManager<O, M, A>
where
    O: OrganizationStore,
    M: MembershipStore,
    A: OptionalAuditStore,
{
    pub fn org_store(&self) -> &O {
        &self.org_store
    }

    pub fn config(&self) -> &OrganizationConfig {
        &self.config
    }

    /// Create an organization with `user_id` as its owner.
    ///
    /// The organization, the owner membership and a trial subscription are
    /// written as one unit. The availability pre-check only shortcuts the
    /// common collision; the store's uniqueness check is authoritative.
    #[instrument(skip(self))]
    pub async fn create_organization(
        &self,
        user_id: &str,
        name: &str,
        slug: &str,
    ) -> Result<Organization> {
        let name = validate_name(name)?;
        let slug = validate_slug(slug)?;

        if !self.org_store.is_slug_available(&slug).await? {
            debug!(slug, "Slug already taken");
            return Err(OrganizationError::slug_taken(&slug));
        }

        let now = current_timestamp();
        let organization = Organization {
            id: new_id(),
            name,
            slug,
            logo: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        };
        let owner = Member {
            organization_id: organization.id.clone(),
            user_id: user_id.to_string(),
            role: Role::Owner,
            created_at: now,
            updated_at: now,
        };
        let subscription = Subscription {
            organization_id: organization.id.clone(),
            plan: Plan::Free,
            status: SubscriptionStatus::Trial,
            trial_ends_at: now + self.config.trial_seconds(),
            created_at: now,
            updated_at: now,
        };

        self.org_store
            .create_with_owner(&organization, &owner, &subscription)
            .await?;

        self.audit_store
            .record(
                OrgAuditEntry::new(OrgAuditEvent::OrgCreated, &organization.id, user_id)
                    .with_details(format!("slug={}", organization.slug)),
            )
            .await;

        info!(
            org_id = %organization.id,
            slug = %organization.slug,
            user_id,
            "Organization created"
        );

        Ok(organization)
    }

    /// Every organization the user belongs to, oldest membership first.
    #[instrument(skip(self))]
    pub async fn get_user_organizations(&self, user_id: &str) -> Result<Vec<OrganizationSummary>> {
        self.org_store.list_for_user(user_id).await
    }

    /// Organization details for one of its members.
    ///
    /// Non-members get `NotFound`, exactly as if the organization did not
    /// exist.
    #[instrument(skip(self))]
    pub async fn get_organization(
        &self,
        org_id: &str,
        user_id: &str,
    ) -> Result<OrganizationDetails> {
        let Some(member) = self.membership_store.find_member(org_id, user_id).await? else {
            debug!(org_id, user_id, "Organization lookup by non-member");
            return Err(OrganizationError::not_found(org_id));
        };

        let organization = self
            .org_store
            .find_by_id(org_id)
            .await?
            .ok_or_else(|| OrganizationError::not_found(org_id))?;

        let member_count = self.membership_store.count_members(org_id).await?;
        let subscription = self.org_store.find_subscription(org_id).await?;

        Ok(OrganizationDetails {
            organization,
            role: member.role,
            member_count,
            subscription,
        })
    }

    /// Change the name and/or logo of the context's organization.
    #[instrument(skip(self, ctx, patch), fields(org_id = %ctx.organization_id))]
    pub async fn update_organization(
        &self,
        ctx: &OrganizationContext,
        patch: OrganizationPatch,
    ) -> Result<Organization> {
        let mut organization = self
            .org_store
            .find_by_id(&ctx.organization_id)
            .await?
            .ok_or_else(|| OrganizationError::not_found(&ctx.organization_id))?;

        if let Some(name) = patch.name {
            organization.name = validate_name(&name)?;
        }
        if let Some(logo) = patch.logo {
            let logo = logo.trim();
            organization.logo = (!logo.is_empty()).then(|| logo.to_string());
        }
        organization.updated_at = current_timestamp();

        self.org_store.update(&organization).await?;

        self.audit_store
            .record(OrgAuditEntry::new(
                OrgAuditEvent::OrgUpdated,
                &organization.id,
                &ctx.user_id,
            ))
            .await;

        info!(org_id = %organization.id, actor_id = %ctx.user_id, "Organization updated");

        Ok(organization)
    }

    /// Delete the context's organization with its members, invitations and
    /// subscription.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id))]
    pub async fn delete_organization(&self, ctx: &OrganizationContext) -> Result<()> {
        self.org_store.delete(&ctx.organization_id).await?;

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::OrgDeleted,
                    &ctx.organization_id,
                    &ctx.user_id,
                )
                .with_details(format!("slug={}", ctx.slug)),
            )
            .await;

        info!(
            org_id = %ctx.organization_id,
            actor_id = %ctx.user_id,
            "Organization deleted"
        );

        Ok(())
    }
}
