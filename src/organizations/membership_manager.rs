//! Membership manager.
//!
//! Member listing, removal, role changes and leaving. Removal and demotion go
//! through the store's guarded operations so the last owner can never be
//! removed or demoted.

use super::audit::{OrgAuditEntry, OrgAuditEvent};
use super::context::OrganizationContext;
use super::error::{OrganizationError, Result};
use super::storage::{MembershipStore, OptionalAuditStore, OrgAuditStore, WithAuditStore};
use super::types::{Member, Role};
use super::utils::current_timestamp;
use tracing::{debug, info, instrument};

/// Membership manager.
///
/// The caller's admin gate is checked by the handler. The hierarchy rule on
/// top of it (only an owner may act on an owner or grant the owner role) is
/// checked by the store's guarded operations against the target's current
/// row.
pub struct MembershipManager<M, A = ()>
where
    M: MembershipStore,
    A: OptionalAuditStore,
{
    membership_store: M,
    audit_store: A,
}

impl<M> MembershipManager<M, ()>
where
    M: MembershipStore,
{
    #[must_use]
    pub fn new(membership_store: M) -> Self {
        Self {
            membership_store,
            audit_store: (),
        }
    }

    /// Enable audit logging with the given store.
    pub fn with_audit_store<AuditStore: OrgAuditStore + Clone + 'static>(
        self,
        audit_store: AuditStore,
    ) -> MembershipManager<M, WithAuditStore<AuditStore>> {
        MembershipManager {
            membership_store: self.membership_store,
            audit_store: WithAuditStore(audit_store),
        }
    }
}

impl<M, A> MembershipManager<M, A>
where
    M: MembershipStore,
    A: OptionalAuditStore,
{
    pub fn membership_store(&self) -> &M {
        &self.membership_store
    }

    /// Members of the context's organization, oldest first.
    pub async fn list_members(&self, ctx: &OrganizationContext) -> Result<Vec<Member>> {
        self.membership_store
            .list_members(&ctx.organization_id)
            .await
    }

    /// A member of the context's organization.
    pub async fn get_member(&self, ctx: &OrganizationContext, user_id: &str) -> Result<Member> {
        self.membership_store
            .find_member(&ctx.organization_id, user_id)
            .await?
            .ok_or_else(|| OrganizationError::member_not_found(user_id))
    }

    /// Remove a member from the context's organization.
    ///
    /// # Errors
    ///
    /// `MemberNotFound`, `RoleRequired` when an admin targets an owner, or
    /// `LastOwner` when the target is the only owner.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id, actor_id = %ctx.user_id))]
    pub async fn remove_member(&self, ctx: &OrganizationContext, user_id: &str) -> Result<Member> {
        let removed = self
            .membership_store
            .remove_member_guarded(&ctx.organization_id, user_id, Some(ctx.role))
            .await
            .inspect_err(|e| debug!(error = %e, "Member removal rejected"))?;

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::MemberRemoved,
                    &ctx.organization_id,
                    &ctx.user_id,
                )
                .with_target(user_id),
            )
            .await;

        info!(
            org_id = %ctx.organization_id,
            user_id,
            actor_id = %ctx.user_id,
            "Member removed"
        );

        Ok(removed)
    }

    /// Change a member's role in the context's organization.
    ///
    /// Demoting the only owner fails `LastOwner`, the same as removing them.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id, actor_id = %ctx.user_id))]
    pub async fn update_member_role(
        &self,
        ctx: &OrganizationContext,
        user_id: &str,
        role: Role,
    ) -> Result<Member> {
        let (previous, updated) = self
            .membership_store
            .change_role_guarded(
                &ctx.organization_id,
                user_id,
                ctx.role,
                role,
                current_timestamp(),
            )
            .await
            .inspect_err(|e| debug!(error = %e, "Role change rejected"))?;

        if previous == role {
            return Ok(updated);
        }

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::MemberRoleChanged,
                    &ctx.organization_id,
                    &ctx.user_id,
                )
                .with_target(user_id)
                .with_details(format!("{previous} -> {role}")),
            )
            .await;

        info!(
            org_id = %ctx.organization_id,
            user_id,
            old_role = %previous,
            new_role = %role,
            actor_id = %ctx.user_id,
            "Member role changed"
        );

        Ok(updated)
    }

    /// Remove the caller from the context's organization.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id, user_id = %ctx.user_id))]
    pub async fn leave_organization(&self, ctx: &OrganizationContext) -> Result<()> {
        self.membership_store
            .remove_member_guarded(&ctx.organization_id, &ctx.user_id, None)
            .await?;

        self.audit_store
            .record(OrgAuditEntry::new(
                OrgAuditEvent::MemberLeft,
                &ctx.organization_id,
                &ctx.user_id,
            ))
            .await;

        info!(
            org_id = %ctx.organization_id,
            user_id = %ctx.user_id,
            "Member left organization"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::memory::InMemoryTenancyStore;
    use crate::organizations::types::Organization;

    async fn seeded(members: &[(&str, Role)]) -> InMemoryTenancyStore {
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
        for (i, (user_id, role)) in members.iter().enumerate() {
            store
                .insert_member(Member {
                    organization_id: "org_1".to_string(),
                    user_id: (*user_id).to_string(),
                    role: *role,
                    created_at: i as u64,
                    updated_at: i as u64,
                })
                .await;
        }
        store
    }

    fn ctx(user_id: &str, role: Role) -> OrganizationContext {
        OrganizationContext {
            organization_id: "org_1".to_string(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            role,
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sole_owner_cannot_be_removed_or_demoted() {
        let store = seeded(&[("u1", Role::Owner), ("u2", Role::Member)]).await;
        let manager = MembershipManager::new(store);
        let owner = ctx("u1", Role::Owner);

        let err = manager.remove_member(&owner, "u1").await.unwrap_err();
        assert!(matches!(err, OrganizationError::LastOwner));

        let err = manager
            .update_member_role(&owner, "u1", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::LastOwner));

        let err = manager.leave_organization(&owner).await.unwrap_err();
        assert!(matches!(err, OrganizationError::LastOwner));
    }

    #[tokio::test]
    async fn test_admin_cannot_touch_owners() {
        let store = seeded(&[("u1", Role::Owner), ("u2", Role::Admin), ("u3", Role::Member)]).await;
        let manager = MembershipManager::new(store);
        let admin = ctx("u2", Role::Admin);

        let err = manager.remove_member(&admin, "u1").await.unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let err = manager
            .update_member_role(&admin, "u3", Role::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let promoted = manager
            .update_member_role(&admin, "u3", Role::Admin)
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_owner_hands_over_and_leaves() {
        let store = seeded(&[("u1", Role::Owner), ("u2", Role::Admin)]).await;
        let manager = MembershipManager::new(store.clone()).with_audit_store(store.clone());
        let owner = ctx("u1", Role::Owner);

        manager
            .update_member_role(&owner, "u2", Role::Owner)
            .await
            .unwrap();
        manager.leave_organization(&owner).await.unwrap();

        let members = manager.list_members(&owner).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, "u2");
        assert_eq!(members[0].role, Role::Owner);

        let events: Vec<OrgAuditEvent> =
            store.audit_entries().await.into_iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            vec![OrgAuditEvent::MemberRoleChanged, OrgAuditEvent::MemberLeft]
        );
    }

    /// Promotes `target` to owner just before each guarded write, as if an
    /// owner's request landed between the admin's check and the write.
    struct PromotesFirst {
        inner: InMemoryTenancyStore,
        target: &'static str,
    }

    impl PromotesFirst {
        async fn promote(&self) {
            self.inner
                .change_role_guarded("org_1", self.target, Role::Owner, Role::Owner, 50)
                .await
                .unwrap();
        }
    }

    #[async_trait::async_trait]
    impl MembershipStore for PromotesFirst {
        async fn find_member(&self, organization_id: &str, user_id: &str) -> Result<Option<Member>> {
            self.inner.find_member(organization_id, user_id).await
        }

        async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>> {
            self.inner.list_members(organization_id).await
        }

        async fn count_with_role(&self, organization_id: &str, role: Role) -> Result<u64> {
            self.inner.count_with_role(organization_id, role).await
        }

        async fn add_member(&self, member: &Member) -> Result<()> {
            self.inner.add_member(member).await
        }

        async fn remove_member_guarded(
            &self,
            organization_id: &str,
            user_id: &str,
            actor: Option<Role>,
        ) -> Result<Member> {
            self.promote().await;
            self.inner
                .remove_member_guarded(organization_id, user_id, actor)
                .await
        }

        async fn change_role_guarded(
            &self,
            organization_id: &str,
            user_id: &str,
            actor: Role,
            role: Role,
            now: u64,
        ) -> Result<(Role, Member)> {
            self.promote().await;
            self.inner
                .change_role_guarded(organization_id, user_id, actor, role, now)
                .await
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_touch_a_member_promoted_mid_request() {
        let store = seeded(&[("u1", Role::Owner), ("u2", Role::Admin), ("tom", Role::Admin)]).await;
        let manager = MembershipManager::new(PromotesFirst {
            inner: store.clone(),
            target: "tom",
        });
        let admin = ctx("u2", Role::Admin);

        let err = manager.remove_member(&admin, "tom").await.unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let err = manager
            .update_member_role(&admin, "tom", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let tom = store.find_member("org_1", "tom").await.unwrap().unwrap();
        assert_eq!(tom.role, Role::Owner);
    }

    #[tokio::test]
    async fn test_unknown_member() {
        let store = seeded(&[("u1", Role::Owner)]).await;
        let manager = MembershipManager::new(store);

        let err = manager
            .remove_member(&ctx("u1", Role::Owner), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::MemberNotFound { .. }));
    }
}
