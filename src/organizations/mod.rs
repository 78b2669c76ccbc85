//! Organization-scoped multi-tenancy.
//!
//! Every tenant-scoped request runs the same chain:
//!
//! 1. [`RequireAuth`](crate::auth::RequireAuth) resolves the caller's identity.
//! 2. [`OrganizationContextResolver`] checks the claimed organization against
//!    the membership store and yields an [`OrganizationContext`].
//! 3. [`RoleGate`] checks the context's role against the operation's allowed
//!    [`RoleSet`].
//! 4. A lifecycle manager performs the operation, taking the tenant id and
//!    the actor from the context only.
//!
//! Storage is trait-based. [`InMemoryTenancyStore`] serves tests and
//! single-process deployments; `SeaOrmTenancyStore` (feature `database`)
//! persists to Postgres or SQLite.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockroom::organizations::{
//!     InMemoryTenancyStore, InvitationConfig, OrganizationConfig, TenancyServices, routes,
//! };
//!
//! let store = InMemoryTenancyStore::new();
//! let services = TenancyServices::new(
//!     store.clone(),
//!     OrganizationConfig::default(),
//!     InvitationConfig::default(),
//! );
//! let app = routes::router(store, resolver, services);
//! ```

pub mod audit;
pub mod auth;
mod config;
mod context;
mod error;
mod gate;
mod invitation_manager;
mod manager;
mod membership_manager;
mod memory;
pub mod routes;
#[cfg(feature = "database")]
mod sea_orm_store;
pub mod storage;
mod types;
mod utils;

pub use audit::{OrgAuditEntry, OrgAuditEvent};
pub use auth::{CurrentOrg, ORG_HEADER, RequireOrgContext, RequireRole};
pub use config::{InvitationConfig, OrganizationConfig};
pub use context::{OrganizationContext, OrganizationContextResolver};
pub use error::OrganizationError;
pub use gate::{GateDecision, OrgAction, RoleGate, RoleSet};
pub use invitation_manager::InvitationManager;
pub use manager::OrganizationManager;
pub use membership_manager::MembershipManager;
pub use memory::InMemoryTenancyStore;
pub use routes::TenancyServices;
#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmTenancyStore;
pub use storage::{
    InvitationStore, MembershipStore, OrgAuditStore, OrganizationStore, TenancyStore,
};
pub use types::{
    Invitation, InvitationStatus, Member, Organization, OrganizationDetails, OrganizationPatch,
    OrganizationSummary, ParseRoleError, ParseStatusError, Plan, Role, Subscription,
    SubscriptionStatus,
};
