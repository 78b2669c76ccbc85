//! Membership storage trait.

use crate::organizations::error::Result;
use crate::organizations::types::{Member, Role};
use async_trait::async_trait;

/// Storage for `(organization, user, role)` rows.
///
/// The guarded operations are the only way to remove a member or change a
/// role. Each one must count owners and write inside the same atomic unit so
/// that two concurrent calls cannot both pass the check and leave the
/// organization without an owner.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Get a specific membership.
    async fn find_member(&self, organization_id: &str, user_id: &str) -> Result<Option<Member>>;

    /// All members of an organization, oldest first.
    async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>>;

    /// Count members holding `role`.
    async fn count_with_role(&self, organization_id: &str, role: Role) -> Result<u64>;

    /// Add a member. Fails `AlreadyMember` on a duplicate `(organization, user)`.
    async fn add_member(&self, member: &Member) -> Result<()>;

    /// Remove a member unless they are the organization's last owner.
    ///
    /// `actor` is the role of the member performing the removal, or `None`
    /// when members remove themselves. It is checked against the target's
    /// current row with [`RoleGate::check_target`] inside the same atomic
    /// unit. Fails `MemberNotFound`, `RoleRequired` or `LastOwner`; returns
    /// the removed row.
    ///
    /// [`RoleGate::check_target`]: crate::organizations::RoleGate::check_target
    async fn remove_member_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Option<Role>,
    ) -> Result<Member>;

    /// Change a member's role unless that demotes the last owner.
    ///
    /// The hierarchy check against `actor` runs on the current row, as in
    /// [`remove_member_guarded`](Self::remove_member_guarded). Fails
    /// `MemberNotFound`, `RoleRequired` or `LastOwner`; returns the previous
    /// role and the updated row.
    async fn change_role_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Role,
        role: Role,
        now: u64,
    ) -> Result<(Role, Member)>;

    /// Count members in an organization.
    async fn count_members(&self, organization_id: &str) -> Result<u64> {
        Ok(self.list_members(organization_id).await?.len() as u64)
    }

    /// Check if a user is a member of an organization.
    async fn is_member(&self, organization_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.find_member(organization_id, user_id).await?.is_some())
    }
}
