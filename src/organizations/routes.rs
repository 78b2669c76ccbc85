//! HTTP routes for the tenancy core.
//!
//! Every request passes [`RequireAuth`] first. Organization-scoped routes
//! then pass [`RequireOrgContext`], and admin-only routes [`RequireRole`].
//! Routes that mix role requirements per method gate inside the handler with
//! [`RoleGate::authorize`].

use super::auth::{CurrentOrg, RequireOrgContext, RequireRole};
use super::config::{InvitationConfig, OrganizationConfig};
use super::error::OrganizationError;
use super::gate::{OrgAction, RoleGate};
use super::invitation_manager::InvitationManager;
use super::manager::OrganizationManager;
use super::membership_manager::MembershipManager;
use super::storage::{OrgAuditStore, TenancyStore, WithAuditStore};
use super::types::{
    Invitation, Member, Organization, OrganizationDetails, OrganizationPatch,
    OrganizationSummary, Role,
};
use crate::auth::{AuthUser, IdentityResolver, RequireAuth};
use crate::traits::mailer::Mailer;
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;

type Result<T> = std::result::Result<T, OrganizationError>;

/// The lifecycle managers behind the routes, sharing one store.
pub struct TenancyServices<S>
where
    S: TenancyStore + OrgAuditStore,
{
    pub organizations: OrganizationManager<S, S, WithAuditStore<S>>,
    pub members: MembershipManager<S, WithAuditStore<S>>,
    pub invitations: InvitationManager<S, S, WithAuditStore<S>>,
}

impl<S> TenancyServices<S>
where
    S: TenancyStore + OrgAuditStore,
{
    pub fn new(store: S, organizations: OrganizationConfig, invitations: InvitationConfig) -> Self {
        Self {
            organizations: OrganizationManager::new(store.clone(), store.clone(), organizations)
                .with_audit_store(store.clone()),
            members: MembershipManager::new(store.clone()).with_audit_store(store.clone()),
            invitations: InvitationManager::new(store.clone(), store.clone(), invitations)
                .with_audit_store(store),
        }
    }

    /// Send invitation notifications through `mailer`.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.invitations = self.invitations.with_mailer(mailer);
        self
    }
}

/// Build the tenancy router.
///
/// # Example
///
/// ```rust,ignore
/// let store = InMemoryTenancyStore::new();
/// let resolver = SessionIdentityResolver::new(InMemorySessionStore::new(), SessionConfig::default());
/// let services = TenancyServices::new(store.clone(), OrganizationConfig::default(), InvitationConfig::default());
///
/// let app = stockroom::organizations::routes::router(store, resolver, services);
/// ```
pub fn router<S, R>(store: S, resolver: R, services: TenancyServices<S>) -> Router
where
    S: TenancyStore + OrgAuditStore,
    R: IdentityResolver,
{
    let admin = Router::new()
        .route(
            "/organization/invitations",
            get(list_invitations::<S>).post(invite_member::<S>),
        )
        .route(
            "/organization/invitations/{id}",
            delete(cancel_invitation::<S>),
        )
        .route(
            "/organization/members/{user_id}",
            patch(update_member_role::<S>).delete(remove_member::<S>),
        )
        .route_layer(from_fn(RequireRole::<S>::admin()));

    let org_scoped = Router::new()
        .route(
            "/organization",
            get(current_organization::<S>)
                .patch(update_organization::<S>)
                .delete(delete_organization::<S>),
        )
        .route("/organization/members", get(list_members::<S>))
        .route("/organization/leave", post(leave_organization::<S>))
        .merge(admin)
        .route_layer(from_fn(RequireOrgContext::<S>::middleware));

    Router::new()
        .route(
            "/organizations",
            get(list_organizations::<S, R>).post(create_organization::<S, R>),
        )
        .route("/organizations/{id}", get(get_organization::<S, R>))
        .route("/invitations/{id}/accept", post(accept_invitation::<S, R>))
        .merge(org_scoped)
        .route_layer(from_fn(RequireAuth::<R>::middleware))
        .with_state(Arc::new(services))
        .layer(Extension(store))
        .layer(Extension(resolver))
}

type AppState<S> = State<Arc<TenancyServices<S>>>;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

async fn create_organization<S, R>(
    State(services): AppState<S>,
    user: AuthUser<R>,
    Json(body): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>)>
where
    S: TenancyStore + OrgAuditStore,
    R: IdentityResolver,
{
    let org = services
        .organizations
        .create_organization(&user.identity().user_id, &body.name, &body.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(org)))
}

async fn list_organizations<S, R>(
    State(services): AppState<S>,
    user: AuthUser<R>,
) -> Result<Json<Vec<OrganizationSummary>>>
where
    S: TenancyStore + OrgAuditStore,
    R: IdentityResolver,
{
    let orgs = services
        .organizations
        .get_user_organizations(&user.identity().user_id)
        .await?;
    Ok(Json(orgs))
}

async fn get_organization<S, R>(
    State(services): AppState<S>,
    user: AuthUser<R>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationDetails>>
where
    S: TenancyStore + OrgAuditStore,
    R: IdentityResolver,
{
    let details = services
        .organizations
        .get_organization(&id, &user.identity().user_id)
        .await?;
    Ok(Json(details))
}

async fn accept_invitation<S, R>(
    State(services): AppState<S>,
    user: AuthUser<R>,
    Path(id): Path<String>,
) -> Result<Json<Organization>>
where
    S: TenancyStore + OrgAuditStore,
    R: IdentityResolver,
{
    let org = services
        .invitations
        .accept_invitation(&id, &user.identity().user_id)
        .await?;
    Ok(Json(org))
}

async fn current_organization<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
) -> Result<Json<OrganizationDetails>>
where
    S: TenancyStore + OrgAuditStore,
{
    RoleGate::authorize(&ctx, OrgAction::ViewOrganization)?;
    let details = services
        .organizations
        .get_organization(&ctx.organization_id, &ctx.user_id)
        .await?;
    Ok(Json(details))
}

async fn update_organization<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
    Json(patch): Json<OrganizationPatch>,
) -> Result<Json<Organization>>
where
    S: TenancyStore + OrgAuditStore,
{
    RoleGate::authorize(&ctx, OrgAction::UpdateOrganization)?;
    let org = services
        .organizations
        .update_organization(&ctx, patch)
        .await?;
    Ok(Json(org))
}

async fn delete_organization<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
) -> Result<StatusCode>
where
    S: TenancyStore + OrgAuditStore,
{
    RoleGate::authorize(&ctx, OrgAction::DeleteOrganization)?;
    services.organizations.delete_organization(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_members<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
) -> Result<Json<Vec<Member>>>
where
    S: TenancyStore + OrgAuditStore,
{
    RoleGate::authorize(&ctx, OrgAction::ListMembers)?;
    Ok(Json(services.members.list_members(&ctx).await?))
}

async fn leave_organization<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
) -> Result<StatusCode>
where
    S: TenancyStore + OrgAuditStore,
{
    RoleGate::authorize(&ctx, OrgAction::LeaveOrganization)?;
    services.members.leave_organization(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_member_role<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<Member>>
where
    S: TenancyStore + OrgAuditStore,
{
    let member = services
        .members
        .update_member_role(&ctx, &user_id, body.role)
        .await?;
    Ok(Json(member))
}

async fn remove_member<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
    Path(user_id): Path<String>,
) -> Result<StatusCode>
where
    S: TenancyStore + OrgAuditStore,
{
    services.members.remove_member(&ctx, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_invitations<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
) -> Result<Json<Vec<Invitation>>>
where
    S: TenancyStore + OrgAuditStore,
{
    Ok(Json(services.invitations.list_pending(&ctx).await?))
}

async fn invite_member<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
    Json(body): Json<InviteMemberRequest>,
) -> Result<(StatusCode, Json<Invitation>)>
where
    S: TenancyStore + OrgAuditStore,
{
    let invitation = services
        .invitations
        .invite_member(&ctx, &body.email, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

async fn cancel_invitation<S>(
    State(services): AppState<S>,
    CurrentOrg(ctx, _): CurrentOrg<S>,
    Path(id): Path<String>,
) -> Result<Json<Invitation>>
where
    S: TenancyStore + OrgAuditStore,
{
    let invitation = services.invitations.cancel_invitation(&ctx, &id).await?;
    Ok(Json(invitation))
}
