//! Invitation manager.
//!
//! Invitations are offers for an email address to join with a role. They are
//! accepted at most once, atomically with the membership insert.

use super::audit::{OrgAuditEntry, OrgAuditEvent};
use super::config::InvitationConfig;
use super::context::OrganizationContext;
use super::error::{OrganizationError, Result};
use super::gate::RoleGate;
use super::storage::{
    InvitationStore, OptionalAuditStore, OrgAuditStore, OrganizationStore, WithAuditStore,
};
use super::types::{Invitation, InvitationStatus, Organization, Role};
use super::utils::{current_timestamp, is_valid_email, new_id, normalize_email};
use crate::traits::mailer::{Email, Mailer};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Invitation manager.
///
/// Notifications are sent in the background through an optional [`Mailer`];
/// a failed send is logged and never fails the invitation.
///
/// # Example
///
/// ```rust,ignore
/// let manager = InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default())
///     .with_mailer(Arc::new(ConsoleMailer::new()));
///
/// let invitation = manager.invite_member(&ctx, "bob@example.com", Role::Member).await?;
/// ```
pub struct InvitationManager<I, O, A = ()>
where
    I: InvitationStore,
    O: OrganizationStore,
    A: OptionalAuditStore,
{
    invitation_store: I,
    org_store: O,
    audit_store: A,
    mailer: Option<Arc<dyn Mailer>>,
    config: InvitationConfig,
}

impl<I, O> InvitationManager<I, O, ()>
where
    I: InvitationStore,
    O: OrganizationStore,
{
    #[must_use]
    pub fn new(invitation_store: I, org_store: O, config: InvitationConfig) -> Self {
        Self {
            invitation_store,
            org_store,
            audit_store: (),
            mailer: None,
            config,
        }
    }

    /// Enable audit logging with the given store.
    pub fn with_audit_store<AuditStore: OrgAuditStore + Clone + 'static>(
        self,
        audit_store: AuditStore,
    ) -> InvitationManager<I, O, WithAuditStore<AuditStore>> {
        InvitationManager {
            invitation_store: self.invitation_store,
            org_store: self.org_store,
            audit_store: WithAuditStore(audit_store),
            mailer: self.mailer,
            config: self.config,
        }
    }
}

impl<I, O, A> InvitationManager<I, O, A>
where
    I: InvitationStore,
    O: OrganizationStore,
    A: OptionalAuditStore,
{
    /// Send invitation notifications through `mailer`.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn config(&self) -> &InvitationConfig {
        &self.config
    }

    /// Invite `email` into the context's organization.
    ///
    /// The address is normalized to lowercase. If an open invitation for the
    /// same address already exists it is returned unchanged and no second
    /// notification goes out. Only owners may invite with the owner role.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id, actor_id = %ctx.user_id))]
    pub async fn invite_member(
        &self,
        ctx: &OrganizationContext,
        email: &str,
        role: Role,
    ) -> Result<Invitation> {
        if !is_valid_email(email) {
            return Err(OrganizationError::invalid_email(email));
        }
        RoleGate::check_target(ctx.role, Role::Member, Some(role)).into_result()?;

        let email = normalize_email(email);
        let now = current_timestamp();

        let invitation = Invitation {
            id: new_id(),
            organization_id: ctx.organization_id.clone(),
            email,
            role,
            status: InvitationStatus::Pending,
            invited_by: ctx.user_id.clone(),
            expires_at: now + self.config.expiry_seconds(),
            created_at: now,
            updated_at: now,
        };

        let (invitation, created) = self
            .invitation_store
            .create_or_get_open_invitation(&invitation, now)
            .await?;
        if !created {
            debug!(invitation_id = %invitation.id, "Open invitation already exists");
            return Ok(invitation);
        }

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::InvitationSent,
                    &ctx.organization_id,
                    &ctx.user_id,
                )
                .with_target(&invitation.email)
                .with_details(format!("role={}", invitation.role)),
            )
            .await;

        info!(
            org_id = %ctx.organization_id,
            invitation_id = %invitation.id,
            role = %invitation.role,
            actor_id = %ctx.user_id,
            "Invitation created"
        );

        self.notify(ctx, &invitation);

        Ok(invitation)
    }

    fn notify(&self, ctx: &OrganizationContext, invitation: &Invitation) {
        let Some(mailer) = self.mailer.clone() else {
            return;
        };

        let link = self.config.accept_url(&invitation.id);
        let email = Email::new(
            &self.config.from_address,
            &invitation.email,
            format!("You've been invited to join {}", ctx.name),
        )
        .text(format!(
            "You have been invited to join {} as {}.\n\nAccept the invitation: {}\n",
            ctx.name, invitation.role, link
        ));
        let invitation_id = invitation.id.clone();

        tokio::spawn(async move {
            if let Err(e) = mailer.send(&email).await {
                warn!(error = %e, invitation_id, "Failed to send invitation email");
            }
        });
    }

    /// Accept an invitation as `user_id` and return the joined organization.
    ///
    /// # Errors
    ///
    /// - `InvitationNotFound` for unknown ids
    /// - `AlreadyProcessed` once accepted or cancelled
    /// - `InvitationExpired` past `expires_at` or once swept
    /// - `AlreadyMember` when the user already belongs to the organization
    #[instrument(skip(self))]
    pub async fn accept_invitation(
        &self,
        invitation_id: &str,
        user_id: &str,
    ) -> Result<Organization> {
        let (invitation, member) = self
            .invitation_store
            .accept_invitation(invitation_id, user_id, current_timestamp())
            .await
            .inspect_err(|e| debug!(error = %e, "Invitation acceptance rejected"))?;

        let organization = self
            .org_store
            .find_by_id(&invitation.organization_id)
            .await?
            .ok_or_else(|| OrganizationError::not_found(&invitation.organization_id))?;

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::InvitationAccepted,
                    &organization.id,
                    user_id,
                )
                .with_target(&invitation.email)
                .with_details(format!("role={}", member.role)),
            )
            .await;

        info!(
            org_id = %organization.id,
            invitation_id,
            user_id,
            role = %member.role,
            "Invitation accepted"
        );

        Ok(organization)
    }

    /// Cancel a pending invitation of the context's organization.
    #[instrument(skip(self, ctx), fields(org_id = %ctx.organization_id, actor_id = %ctx.user_id))]
    pub async fn cancel_invitation(
        &self,
        ctx: &OrganizationContext,
        invitation_id: &str,
    ) -> Result<Invitation> {
        let invitation = self
            .invitation_store
            .cancel_invitation(&ctx.organization_id, invitation_id, current_timestamp())
            .await?;

        self.audit_store
            .record(
                OrgAuditEntry::new(
                    OrgAuditEvent::InvitationCancelled,
                    &ctx.organization_id,
                    &ctx.user_id,
                )
                .with_target(&invitation.email),
            )
            .await;

        info!(
            org_id = %ctx.organization_id,
            invitation_id,
            actor_id = %ctx.user_id,
            "Invitation cancelled"
        );

        Ok(invitation)
    }

    /// Open invitations of the context's organization.
    pub async fn list_pending(&self, ctx: &OrganizationContext) -> Result<Vec<Invitation>> {
        self.invitation_store
            .list_pending(&ctx.organization_id, current_timestamp())
            .await
    }

    /// Mark every pending invitation past its expiry as expired.
    #[instrument(skip(self))]
    pub async fn expire_stale_invitations(&self) -> Result<u64> {
        let expired = self
            .invitation_store
            .expire_stale(current_timestamp())
            .await?;
        if expired > 0 {
            info!(expired, "Expired stale invitations");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::memory::InMemoryTenancyStore;
    use crate::organizations::storage::MembershipStore;
    use crate::testing::RecordingMailer;

    async fn setup() -> (InMemoryTenancyStore, OrganizationContext) {
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
        let ctx = OrganizationContext {
            organization_id: "org_1".to_string(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            role: Role::Owner,
            user_id: "u1".to_string(),
        };
        (store, ctx)
    }

    #[tokio::test]
    async fn test_invite_then_accept() {
        let (store, ctx) = setup().await;
        let manager =
            InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default());

        let before = current_timestamp();
        let invitation = manager
            .invite_member(&ctx, "Bob@X.com", Role::Member)
            .await
            .unwrap();
        assert_eq!(invitation.email, "bob@x.com");
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(invitation.expires_at >= before + 7 * 86_400);

        let org = manager.accept_invitation(&invitation.id, "u2").await.unwrap();
        assert_eq!(org.slug, "acme");
        let member = store.find_member("org_1", "u2").await.unwrap().unwrap();
        assert_eq!(member.role, Role::Member);

        let err = manager
            .accept_invitation(&invitation.id, "u3")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_invite_reuses_open_invitation() {
        let (store, ctx) = setup().await;
        let mailer = RecordingMailer::new();
        let manager =
            InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default())
                .with_mailer(Arc::new(mailer.clone()));

        let first = manager
            .invite_member(&ctx, "bob@x.com", Role::Member)
            .await
            .unwrap();
        let second = manager
            .invite_member(&ctx, "BOB@x.com", Role::Admin)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Member);
        assert_eq!(manager.list_pending(&ctx).await.unwrap().len(), 1);

        let sent = mailer.wait_for(1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["bob@x.com".to_string()]);
        assert!(sent[0].text.as_deref().unwrap_or_default().contains(&first.id));
    }

    #[tokio::test]
    async fn test_mailer_failure_does_not_fail_invite() {
        let (store, ctx) = setup().await;
        let manager =
            InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default())
                .with_mailer(Arc::new(RecordingMailer::failing()));

        let invitation = manager
            .invite_member(&ctx, "bob@x.com", Role::Member)
            .await
            .unwrap();
        assert!(store.find_invitation(&invitation.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_email_and_owner_grant_rules() {
        let (store, ctx) = setup().await;
        let manager =
            InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default());

        let err = manager
            .invite_member(&ctx, "not-an-email", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::InvalidEmail { .. }));

        let admin = OrganizationContext {
            role: Role::Admin,
            ..ctx.clone()
        };
        let err = manager
            .invite_member(&admin, "carol@x.com", Role::Owner)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        manager
            .invite_member(&ctx, "carol@x.com", Role::Owner)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_and_sweep() {
        let (store, ctx) = setup().await;
        let manager =
            InvitationManager::new(store.clone(), store.clone(), InvitationConfig::default())
                .with_audit_store(store.clone());

        let invitation = manager
            .invite_member(&ctx, "bob@x.com", Role::Member)
            .await
            .unwrap();
        let cancelled = manager
            .cancel_invitation(&ctx, &invitation.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, InvitationStatus::Cancelled);

        let err = manager
            .accept_invitation(&invitation.id, "u2")
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::AlreadyProcessed { .. }));

        store
            .insert_invitation(Invitation {
                id: "inv_stale".to_string(),
                organization_id: "org_1".to_string(),
                email: "old@x.com".to_string(),
                role: Role::Member,
                status: InvitationStatus::Pending,
                invited_by: "u1".to_string(),
                expires_at: 10,
                created_at: 1,
                updated_at: 1,
            })
            .await;
        assert_eq!(manager.expire_stale_invitations().await.unwrap(), 1);

        let err = manager.accept_invitation("inv_stale", "u2").await.unwrap_err();
        assert!(matches!(err, OrganizationError::InvitationExpired));

        let events: Vec<OrgAuditEvent> =
            store.audit_entries().await.into_iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            vec![OrgAuditEvent::InvitationSent, OrgAuditEvent::InvitationCancelled]
        );
    }
}
