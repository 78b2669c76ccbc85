//! In-memory tenancy store.
//!
//! Every operation takes one lock over the whole state, so the multi-row
//! operations are atomic with respect to each other. Suitable for tests and
//! single-process deployments.

use super::audit::OrgAuditEntry;
use super::error::{OrganizationError, Result};
use super::gate::RoleGate;
use super::storage::{InvitationStore, MembershipStore, OrgAuditStore, OrganizationStore};
use super::types::{
    Invitation, InvitationStatus, Member, Organization, OrganizationSummary, Role, Subscription,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    organizations: HashMap<String, Organization>,
    /// slug -> organization id
    slugs: HashMap<String, String>,
    /// (organization id, user id) -> member
    members: BTreeMap<(String, String), Member>,
    invitations: HashMap<String, Invitation>,
    subscriptions: HashMap<String, Subscription>,
    audit: Vec<OrgAuditEntry>,
}

impl State {
    fn owner_count(&self, organization_id: &str) -> u64 {
        self.members
            .values()
            .filter(|m| m.organization_id == organization_id && m.role == Role::Owner)
            .count() as u64
    }

    fn member_count(&self, organization_id: &str) -> u64 {
        self.members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .count() as u64
    }

    /// Whether dropping `member`'s owner role would leave no owner.
    fn is_last_owner(&self, member: &Member) -> bool {
        member.role == Role::Owner && self.owner_count(&member.organization_id) <= 1
    }
}

/// Tenancy store held in process memory.
///
/// Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryTenancyStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryTenancyStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an organization directly, bypassing the lifecycle manager.
    pub async fn insert_organization(&self, organization: Organization) {
        let mut state = self.state.write().await;
        state
            .slugs
            .insert(organization.slug.clone(), organization.id.clone());
        state
            .organizations
            .insert(organization.id.clone(), organization);
    }

    /// Insert or overwrite a membership directly.
    pub async fn insert_member(&self, member: Member) {
        let key = (member.organization_id.clone(), member.user_id.clone());
        self.state.write().await.members.insert(key, member);
    }

    /// Insert or overwrite an invitation directly.
    pub async fn insert_invitation(&self, invitation: Invitation) {
        self.state
            .write()
            .await
            .invitations
            .insert(invitation.id.clone(), invitation);
    }

    /// Recorded audit entries, oldest first.
    pub async fn audit_entries(&self) -> Vec<OrgAuditEntry> {
        self.state.read().await.audit.clone()
    }
}

#[async_trait]
impl OrganizationStore for InMemoryTenancyStore {
    async fn create_with_owner(
        &self,
        organization: &Organization,
        owner: &Member,
        subscription: &Subscription,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if state.slugs.contains_key(&organization.slug) {
            return Err(OrganizationError::slug_taken(&organization.slug));
        }

        state
            .slugs
            .insert(organization.slug.clone(), organization.id.clone());
        state
            .organizations
            .insert(organization.id.clone(), organization.clone());
        state.members.insert(
            (owner.organization_id.clone(), owner.user_id.clone()),
            owner.clone(),
        );
        state
            .subscriptions
            .insert(subscription.organization_id.clone(), subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>> {
        Ok(self.state.read().await.organizations.get(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let state = self.state.read().await;
        Ok(state
            .slugs
            .get(slug)
            .and_then(|id| state.organizations.get(id))
            .cloned())
    }

    async fn update(&self, organization: &Organization) -> Result<()> {
        let mut state = self.state.write().await;
        let existing = state
            .organizations
            .get_mut(&organization.id)
            .ok_or_else(|| OrganizationError::not_found(&organization.id))?;
        existing.name = organization.name.clone();
        existing.logo = organization.logo.clone();
        existing.metadata = organization.metadata.clone();
        existing.updated_at = organization.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let organization = state
            .organizations
            .remove(id)
            .ok_or_else(|| OrganizationError::not_found(id))?;
        state.slugs.remove(&organization.slug);
        state.members.retain(|(org_id, _), _| org_id != id);
        state.invitations.retain(|_, inv| inv.organization_id != id);
        state.subscriptions.remove(id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<OrganizationSummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<OrganizationSummary> = state
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                let organization = state.organizations.get(&m.organization_id)?;
                Some(OrganizationSummary {
                    organization: organization.clone(),
                    role: m.role,
                    member_count: state.member_count(&m.organization_id),
                    joined_at: m.created_at,
                })
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.organization.id.cmp(&b.organization.id))
        });
        Ok(summaries)
    }

    async fn find_subscription(&self, organization_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .state
            .read()
            .await
            .subscriptions
            .get(organization_id)
            .cloned())
    }
}

#[async_trait]
impl MembershipStore for InMemoryTenancyStore {
    async fn find_member(&self, organization_id: &str, user_id: &str) -> Result<Option<Member>> {
        let key = (organization_id.to_string(), user_id.to_string());
        Ok(self.state.read().await.members.get(&key).cloned())
    }

    async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>> {
        let state = self.state.read().await;
        let mut members: Vec<Member> = state
            .members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(members)
    }

    async fn count_with_role(&self, organization_id: &str, role: Role) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .members
            .values()
            .filter(|m| m.organization_id == organization_id && m.role == role)
            .count() as u64)
    }

    async fn count_members(&self, organization_id: &str) -> Result<u64> {
        Ok(self.state.read().await.member_count(organization_id))
    }

    async fn add_member(&self, member: &Member) -> Result<()> {
        let mut state = self.state.write().await;
        let key = (member.organization_id.clone(), member.user_id.clone());
        if state.members.contains_key(&key) {
            return Err(OrganizationError::AlreadyMember);
        }
        state.members.insert(key, member.clone());
        Ok(())
    }

    async fn remove_member_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Option<Role>,
    ) -> Result<Member> {
        let mut state = self.state.write().await;
        let key = (organization_id.to_string(), user_id.to_string());
        let member = state
            .members
            .get(&key)
            .ok_or_else(|| OrganizationError::member_not_found(user_id))?;

        if let Some(actor) = actor {
            RoleGate::check_target(actor, member.role, None).into_result()?;
        }
        if state.is_last_owner(member) {
            return Err(OrganizationError::LastOwner);
        }

        state
            .members
            .remove(&key)
            .ok_or_else(|| OrganizationError::member_not_found(user_id))
    }

    async fn change_role_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Role,
        role: Role,
        now: u64,
    ) -> Result<(Role, Member)> {
        let mut state = self.state.write().await;
        let key = (organization_id.to_string(), user_id.to_string());
        let member = state
            .members
            .get(&key)
            .ok_or_else(|| OrganizationError::member_not_found(user_id))?;

        RoleGate::check_target(actor, member.role, Some(role)).into_result()?;
        if role != Role::Owner && state.is_last_owner(member) {
            return Err(OrganizationError::LastOwner);
        }

        let member = state
            .members
            .get_mut(&key)
            .ok_or_else(|| OrganizationError::member_not_found(user_id))?;
        let previous = member.role;
        if previous != role {
            member.role = role;
            member.updated_at = now;
        }
        Ok((previous, member.clone()))
    }
}

#[async_trait]
impl InvitationStore for InMemoryTenancyStore {
    async fn create_invitation(&self, invitation: &Invitation) -> Result<()> {
        let mut state = self.state.write().await;
        if !state
            .organizations
            .contains_key(&invitation.organization_id)
        {
            return Err(OrganizationError::not_found(&invitation.organization_id));
        }
        state
            .invitations
            .insert(invitation.id.clone(), invitation.clone());
        Ok(())
    }

    async fn create_or_get_open_invitation(
        &self,
        invitation: &Invitation,
        now: u64,
    ) -> Result<(Invitation, bool)> {
        let mut state = self.state.write().await;
        if !state
            .organizations
            .contains_key(&invitation.organization_id)
        {
            return Err(OrganizationError::not_found(&invitation.organization_id));
        }

        let open = state.invitations.values().find(|i| {
            i.organization_id == invitation.organization_id
                && i.email == invitation.email
                && i.is_open_at(now)
        });
        if let Some(existing) = open {
            return Ok((existing.clone(), false));
        }

        state
            .invitations
            .insert(invitation.id.clone(), invitation.clone());
        Ok((invitation.clone(), true))
    }

    async fn find_invitation(&self, id: &str) -> Result<Option<Invitation>> {
        Ok(self.state.read().await.invitations.get(id).cloned())
    }

    async fn list_pending(&self, organization_id: &str, now: u64) -> Result<Vec<Invitation>> {
        let state = self.state.read().await;
        let mut pending: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|i| i.organization_id == organization_id && i.is_open_at(now))
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(pending)
    }

    async fn accept_invitation(
        &self,
        id: &str,
        user_id: &str,
        now: u64,
    ) -> Result<(Invitation, Member)> {
        let mut state = self.state.write().await;
        let invitation = state
            .invitations
            .get(id)
            .ok_or_else(|| OrganizationError::invitation_not_found(id))?;

        match invitation.status {
            InvitationStatus::Pending if invitation.is_expired_at(now) => {
                return Err(OrganizationError::InvitationExpired);
            }
            InvitationStatus::Pending => {}
            InvitationStatus::Expired => return Err(OrganizationError::InvitationExpired),
            status @ (InvitationStatus::Accepted | InvitationStatus::Cancelled) => {
                return Err(OrganizationError::already_processed(status));
            }
        }

        let key = (invitation.organization_id.clone(), user_id.to_string());
        if !state
            .organizations
            .contains_key(&invitation.organization_id)
        {
            return Err(OrganizationError::invitation_not_found(id));
        }
        if state.members.contains_key(&key) {
            return Err(OrganizationError::AlreadyMember);
        }

        let member = Member {
            organization_id: invitation.organization_id.clone(),
            user_id: user_id.to_string(),
            role: invitation.role,
            created_at: now,
            updated_at: now,
        };
        state.members.insert(key, member.clone());

        let invitation = state
            .invitations
            .get_mut(id)
            .ok_or_else(|| OrganizationError::invitation_not_found(id))?;
        invitation.status = InvitationStatus::Accepted;
        invitation.updated_at = now;
        Ok((invitation.clone(), member))
    }

    async fn cancel_invitation(
        &self,
        organization_id: &str,
        id: &str,
        now: u64,
    ) -> Result<Invitation> {
        let mut state = self.state.write().await;
        let invitation = state
            .invitations
            .get_mut(id)
            .filter(|i| i.organization_id == organization_id)
            .ok_or_else(|| OrganizationError::invitation_not_found(id))?;

        if invitation.status != InvitationStatus::Pending {
            return Err(OrganizationError::already_processed(invitation.status));
        }

        invitation.status = InvitationStatus::Cancelled;
        invitation.updated_at = now;
        Ok(invitation.clone())
    }

    async fn expire_stale(&self, now: u64) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut expired = 0;
        for invitation in state.invitations.values_mut() {
            if invitation.status == InvitationStatus::Pending && invitation.is_expired_at(now) {
                invitation.status = InvitationStatus::Expired;
                invitation.updated_at = now;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl OrgAuditStore for InMemoryTenancyStore {
    async fn record_audit(&self, entry: &OrgAuditEntry) -> Result<()> {
        self.state.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn org_audit_log(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<OrgAuditEntry>> {
        let state = self.state.read().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| e.org_id == organization_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
