//! Organization audit storage trait.

use crate::organizations::audit::OrgAuditEntry;
use crate::organizations::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Persistence for audit entries.
#[async_trait]
pub trait OrgAuditStore: Send + Sync {
    /// Record an audit entry.
    async fn record_audit(&self, entry: &OrgAuditEntry) -> Result<()>;

    /// Audit log of an organization, newest first.
    async fn org_audit_log(&self, organization_id: &str, limit: usize)
    -> Result<Vec<OrgAuditEntry>>;
}

/// Audit sink used by the managers.
///
/// `()` disables auditing; [`WithAuditStore`] forwards to a real store.
pub trait OptionalAuditStore: Send + Sync + Clone + 'static {
    /// Record an entry. Errors are logged, never propagated.
    fn record(&self, entry: OrgAuditEntry) -> impl Future<Output = ()> + Send;
}

impl OptionalAuditStore for () {
    async fn record(&self, _entry: OrgAuditEntry) {}
}

/// Enables audit logging with a real store.
#[derive(Clone)]
pub struct WithAuditStore<A: OrgAuditStore + Clone>(pub A);

impl<A: OrgAuditStore + Clone + 'static> OptionalAuditStore for WithAuditStore<A> {
    async fn record(&self, entry: OrgAuditEntry) {
        if let Err(e) = self.0.record_audit(&entry).await {
            tracing::warn!(
                error = %e,
                event = %entry.event,
                org_id = %entry.org_id,
                "Failed to record audit entry"
            );
        }
    }
}
