//! Organization audit trail.
//!
//! Every state-changing tenancy operation emits one entry. Recording is
//! best-effort and never fails the operation that produced it.

use serde::{Deserialize, Serialize};

/// Audit entry for organization operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgAuditEntry {
    pub id: String,
    pub event: OrgAuditEvent,
    pub org_id: String,
    /// User who performed the action.
    pub actor_id: String,
    /// Affected user, or invitee email for invitation events.
    pub target_id: Option<String>,
    pub details: Option<String>,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Organization audit event types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrgAuditEvent {
    OrgCreated,
    OrgUpdated,
    OrgDeleted,
    MemberRemoved,
    MemberLeft,
    MemberRoleChanged,
    InvitationSent,
    InvitationAccepted,
    InvitationCancelled,
}

impl OrgAuditEvent {
    pub const ALL: [OrgAuditEvent; 9] = [
        Self::OrgCreated,
        Self::OrgUpdated,
        Self::OrgDeleted,
        Self::MemberRemoved,
        Self::MemberLeft,
        Self::MemberRoleChanged,
        Self::InvitationSent,
        Self::InvitationAccepted,
        Self::InvitationCancelled,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrgCreated => "org_created",
            Self::OrgUpdated => "org_updated",
            Self::OrgDeleted => "org_deleted",
            Self::MemberRemoved => "member_removed",
            Self::MemberLeft => "member_left",
            Self::MemberRoleChanged => "member_role_changed",
            Self::InvitationSent => "invitation_sent",
            Self::InvitationAccepted => "invitation_accepted",
            Self::InvitationCancelled => "invitation_cancelled",
        }
    }
}

impl std::fmt::Display for OrgAuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrgAuditEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("unknown audit event: '{s}'"))
    }
}

impl OrgAuditEntry {
    /// Create a new audit entry with the given event and organization.
    #[must_use]
    pub fn new(
        event: OrgAuditEvent,
        org_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            id: super::utils::new_id(),
            event,
            org_id: org_id.into(),
            actor_id: actor_id.into(),
            target_id: None,
            details: None,
            timestamp: super::utils::current_timestamp(),
        }
    }

    /// Set the target user ID.
    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Set additional details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
