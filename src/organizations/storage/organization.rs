//! Organization storage trait.

use crate::organizations::error::Result;
use crate::organizations::types::{
    Member, Organization, OrganizationSummary, Subscription,
};
use async_trait::async_trait;

/// Storage for organizations and their subscriptions.
///
/// # Slug uniqueness
///
/// Implementations **must** enforce slug uniqueness at write time and report
/// a collision as [`OrganizationError::SlugTaken`]. The lifecycle manager
/// checks availability first, but that check only gives a friendlier error
/// on the common path; two concurrent creations can both pass it.
///
/// [`OrganizationError::SlugTaken`]: crate::organizations::OrganizationError::SlugTaken
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Persist an organization, its first owner and its subscription as one
    /// unit. Either all three rows exist afterwards or none do.
    async fn create_with_owner(
        &self,
        organization: &Organization,
        owner: &Member,
        subscription: &Subscription,
    ) -> Result<()>;

    /// Find an organization by its ID.
    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>>;

    /// Find an organization by its slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    /// Update name, logo, metadata and `updated_at`. Fails `NotFound` when the
    /// organization no longer exists.
    async fn update(&self, organization: &Organization) -> Result<()>;

    /// Delete an organization together with its members, invitations and
    /// subscription. Fails `NotFound` when it does not exist.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Organizations the user belongs to, oldest membership first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<OrganizationSummary>>;

    /// Subscription attached to an organization.
    async fn find_subscription(&self, organization_id: &str) -> Result<Option<Subscription>>;

    /// Check if a slug is available.
    ///
    /// Default implementation checks if `find_by_slug` returns None.
    async fn is_slug_available(&self, slug: &str) -> Result<bool> {
        Ok(self.find_by_slug(slug).await?.is_none())
    }
}
