//! Invitation storage trait.

use crate::organizations::error::Result;
use crate::organizations::types::{Invitation, Member};
use async_trait::async_trait;

/// Storage for invitations.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Create a new invitation.
    async fn create_invitation(&self, invitation: &Invitation) -> Result<()>;

    /// Create `invitation` unless an open one already exists for the same
    /// organization and email at `now`.
    ///
    /// Lookup and insert form one atomic unit, so concurrent calls for the
    /// same address yield a single pending row. Returns the stored
    /// invitation and whether it was created by this call.
    async fn create_or_get_open_invitation(
        &self,
        invitation: &Invitation,
        now: u64,
    ) -> Result<(Invitation, bool)>;

    /// Find an invitation by its ID.
    async fn find_invitation(&self, id: &str) -> Result<Option<Invitation>>;

    /// Pending invitations of an organization that are still open at `now`.
    async fn list_pending(&self, organization_id: &str, now: u64) -> Result<Vec<Invitation>>;

    /// Accept an invitation for `user_id`.
    ///
    /// In one atomic unit: checks the invitation is pending and unexpired at
    /// `now`, inserts the member with the invited role and flips the
    /// invitation to `accepted`. Fails `InvitationNotFound`,
    /// `AlreadyProcessed`, `InvitationExpired` or `AlreadyMember` without
    /// changing anything.
    async fn accept_invitation(
        &self,
        id: &str,
        user_id: &str,
        now: u64,
    ) -> Result<(Invitation, Member)>;

    /// Cancel a pending invitation of `organization_id`.
    ///
    /// Invitations of other organizations are reported as not found.
    async fn cancel_invitation(&self, organization_id: &str, id: &str, now: u64)
    -> Result<Invitation>;

    /// Flip every pending invitation past its expiry to `expired`.
    async fn expire_stale(&self, now: u64) -> Result<u64>;
}
