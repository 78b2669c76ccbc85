//! Tenancy data model.
//!
//! Timestamps are Unix seconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user inside one organization.
///
/// The set is closed: every permission decision is made against these three
/// values through the [`RoleGate`](crate::organizations::RoleGate).
///
/// # Example
///
/// ```rust
/// use stockroom::organizations::Role;
///
/// assert!(Role::Owner.has_at_least(&Role::Admin));
/// assert!(!Role::Member.has_at_least(&Role::Admin));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including deletion of the organization.
    Owner,
    /// Manages settings, members and invitations.
    Admin,
    /// Regular member.
    #[default]
    Member,
}

impl Role {
    /// All roles, highest first.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Admin, Role::Member];

    /// Get the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Get the hierarchy level (higher = more permissions).
    #[must_use]
    pub fn hierarchy_level(&self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Member => 1,
        }
    }

    /// Check if this role has at least the permissions of another role.
    #[must_use]
    pub fn has_at_least(&self, other: &Self) -> bool {
        self.hierarchy_level() >= other.hierarchy_level()
    }
}

/// Error returned when parsing a role string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    invalid_value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected: owner, admin, or member)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            _ => Err(ParseRoleError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tenant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    /// Globally unique, URL-safe, immutable after creation.
    pub slug: String,
    pub logo: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Membership of a user in an organization, unique on `(organization_id, user_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub organization_id: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Lifecycle state of an invitation.
///
/// Starts as `Pending` and moves at most once to one of the other states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Error returned when parsing an invitation status fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid_value: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: '{}'", self.invalid_value)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for InvitationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An offer for an email address to join an organization with a role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub organization_id: String,
    /// Lowercased invitee address.
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    /// User who sent the invitation.
    pub invited_by: String,
    pub expires_at: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Invitation {
    /// Whether the acceptance window has closed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Pending and still inside its acceptance window.
    #[must_use]
    pub fn is_open_at(&self, now: u64) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired_at(now)
    }
}

/// Billing plan attached to an organization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
}

impl Plan {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
        }
    }
}

impl FromStr for Plan {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            _ => Err(ParseStatusError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Billing state of an organization's subscription.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Trial,
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseStatusError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Subscription created together with every organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub organization_id: String,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub trial_ends_at: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Changes accepted by an organization update.
///
/// Only the display name and logo can change. An empty `logo` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

/// One entry of a user's organization list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    #[serde(flatten)]
    pub organization: Organization,
    /// The listing user's role.
    pub role: Role,
    pub member_count: u64,
    /// When the listing user joined.
    pub joined_at: u64,
}

/// Organization as seen by one of its members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    #[serde(flatten)]
    pub organization: Organization,
    /// The caller's role.
    pub role: Role,
    pub member_count: u64,
    pub subscription: Option<Subscription>,
}
