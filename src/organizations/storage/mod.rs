//! Storage traits for the tenancy core.
//!
//! Each trait covers one record family. Multi-row invariants (the creation
//! bundle, invitation acceptance, the last-owner guard) live behind single
//! trait methods so every backend executes them atomically.

mod audit;
mod invitation;
mod membership;
mod organization;

pub use audit::{OptionalAuditStore, OrgAuditStore, WithAuditStore};
pub use invitation::InvitationStore;
pub use membership::MembershipStore;
pub use organization::OrganizationStore;

/// A backend implementing every tenancy store.
pub trait TenancyStore:
    OrganizationStore + MembershipStore + InvitationStore + Clone + 'static
{
}

impl<T> TenancyStore for T where
    T: OrganizationStore + MembershipStore + InvitationStore + Clone + 'static
{
}
