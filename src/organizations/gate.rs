//! Role-based permission checks.
//!
//! The gate is pure: it looks only at the roles it is given. Every privileged
//! operation names its allowed [`RoleSet`] explicitly through [`OrgAction`];
//! an empty set denies everyone.

use super::context::OrganizationContext;
use super::error::{OrganizationError, Result};
use super::types::Role;
use std::fmt;

/// A set of roles allowed to perform an operation.
///
/// # Example
///
/// ```rust
/// use stockroom::organizations::{Role, RoleSet};
///
/// assert!(RoleSet::ADMIN.contains(Role::Owner));
/// assert!(!RoleSet::ADMIN.contains(Role::Member));
/// assert!(!RoleSet::default().contains(Role::Owner));
/// assert_eq!(RoleSet::ADMIN.to_string(), "owner or admin");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    /// Allows nobody.
    pub const NONE: RoleSet = RoleSet(0);
    /// `{OWNER}`
    pub const OWNER: RoleSet = RoleSet::NONE.with(Role::Owner);
    /// `{OWNER, ADMIN}`
    pub const ADMIN: RoleSet = RoleSet::OWNER.with(Role::Admin);
    /// Every member.
    pub const ANY_MEMBER: RoleSet = RoleSet::ADMIN.with(Role::Member);

    const fn bit(role: Role) -> u8 {
        match role {
            Role::Owner => 1,
            Role::Admin => 2,
            Role::Member => 4,
        }
    }

    /// Add a role to the set.
    #[must_use]
    pub const fn with(self, role: Role) -> Self {
        Self(self.0 | Self::bit(role))
    }

    #[must_use]
    pub const fn contains(&self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Roles in the set, highest first.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::NONE, RoleSet::with)
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no");
        }
        let names: Vec<&str> = self.roles().map(|r| r.as_str()).collect();
        f.write_str(&names.join(" or "))
    }
}

/// Outcome of a gate check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny {
        /// Roles that would have been allowed.
        required: RoleSet,
    },
}

impl GateDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert a denial into a `RoleRequired` error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny { required } => Err(OrganizationError::role_required(required.to_string())),
        }
    }
}

/// Privileged operations and the roles allowed to perform them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrgAction {
    ViewOrganization,
    ListMembers,
    UpdateOrganization,
    DeleteOrganization,
    InviteMember,
    ListInvitations,
    CancelInvitation,
    RemoveMember,
    ChangeMemberRole,
    LeaveOrganization,
}

impl OrgAction {
    /// The declared allowed-role set.
    #[must_use]
    pub const fn allowed_roles(&self) -> RoleSet {
        match self {
            Self::ViewOrganization | Self::ListMembers | Self::LeaveOrganization => {
                RoleSet::ANY_MEMBER
            }
            Self::UpdateOrganization
            | Self::InviteMember
            | Self::ListInvitations
            | Self::CancelInvitation
            | Self::RemoveMember
            | Self::ChangeMemberRole => RoleSet::ADMIN,
            Self::DeleteOrganization => RoleSet::OWNER,
        }
    }
}

/// Permission checks over an [`OrganizationContext`].
pub struct RoleGate;

impl RoleGate {
    /// Check a role against an allowed set.
    #[must_use]
    pub fn check(role: Role, allowed: RoleSet) -> GateDecision {
        if allowed.contains(role) {
            GateDecision::Allow
        } else {
            GateDecision::Deny { required: allowed }
        }
    }

    /// Fail with `RoleRequired` unless the caller's role is allowed.
    pub fn require(ctx: &OrganizationContext, allowed: RoleSet) -> Result<()> {
        let decision = Self::check(ctx.role, allowed);
        if !decision.is_allowed() {
            tracing::debug!(
                user_id = %ctx.user_id,
                org_id = %ctx.organization_id,
                role = %ctx.role,
                required = %allowed,
                "Role gate denied"
            );
        }
        decision.into_result()
    }

    /// `{OWNER, ADMIN}`
    pub fn require_admin(ctx: &OrganizationContext) -> Result<()> {
        Self::require(ctx, RoleSet::ADMIN)
    }

    /// `{OWNER}`
    pub fn require_owner(ctx: &OrganizationContext) -> Result<()> {
        Self::require(ctx, RoleSet::OWNER)
    }

    /// Check the allowed set declared for `action`.
    pub fn authorize(ctx: &OrganizationContext, action: OrgAction) -> Result<()> {
        Self::require(ctx, action.allowed_roles())
    }

    /// Only an owner may act on an owner's membership or grant the owner role.
    #[must_use]
    pub fn check_target(actor: Role, target: Role, new_role: Option<Role>) -> GateDecision {
        let touches_owner = target == Role::Owner || new_role == Some(Role::Owner);
        if touches_owner {
            Self::check(actor, RoleSet::OWNER)
        } else {
            GateDecision::Allow
        }
    }
}
