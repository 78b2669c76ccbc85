//! SeaORM-backed tenancy storage.
//!
//! Every multi-row operation runs inside one database transaction. The
//! last-owner guard locks the organization row (`SELECT ... FOR UPDATE` on
//! backends that support it) before counting owners, so concurrent removals
//! and demotions serialize on it.
//!
//! The tables are created by [`TenancyMigrator`](crate::database::TenancyMigrator):
//!
//! ```sql
//! CREATE TABLE organizations (
//!     id VARCHAR PRIMARY KEY,
//!     name VARCHAR NOT NULL,
//!     slug VARCHAR UNIQUE NOT NULL,
//!     logo VARCHAR NULL,
//!     metadata JSON NULL,
//!     created_at BIGINT NOT NULL,
//!     updated_at BIGINT NOT NULL
//! );
//!
//! CREATE TABLE organization_members (
//!     organization_id VARCHAR NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
//!     user_id VARCHAR NOT NULL,
//!     role VARCHAR NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     updated_at BIGINT NOT NULL,
//!     PRIMARY KEY (organization_id, user_id)
//! );
//!
//! CREATE TABLE organization_invitations (
//!     id VARCHAR PRIMARY KEY,
//!     organization_id VARCHAR NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
//!     email VARCHAR NOT NULL,
//!     role VARCHAR NOT NULL,
//!     status VARCHAR NOT NULL,
//!     invited_by VARCHAR NOT NULL,
//!     expires_at BIGINT NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     updated_at BIGINT NOT NULL
//! );
//!
//! CREATE TABLE organization_subscriptions (
//!     organization_id VARCHAR PRIMARY KEY REFERENCES organizations(id) ON DELETE CASCADE,
//!     plan VARCHAR NOT NULL,
//!     status VARCHAR NOT NULL,
//!     trial_ends_at BIGINT NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     updated_at BIGINT NOT NULL
//! );
//!
//! CREATE TABLE organization_audit_log (
//!     id VARCHAR PRIMARY KEY,
//!     event VARCHAR NOT NULL,
//!     org_id VARCHAR NOT NULL,
//!     actor_id VARCHAR NOT NULL,
//!     target_id VARCHAR NULL,
//!     details TEXT NULL,
//!     timestamp BIGINT NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use std::fmt::Display;

use super::audit::OrgAuditEntry;
use super::error::{OrganizationError, Result};
use super::gate::RoleGate;
use super::storage::{InvitationStore, MembershipStore, OrgAuditStore, OrganizationStore};
use super::types::{
    Invitation, InvitationStatus, Member, Organization, OrganizationSummary, Role, Subscription,
};
use crate::error::StockroomError;

mod entity {
    pub mod organization {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "organizations")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: String,
            pub name: String,
            #[sea_orm(unique)]
            pub slug: String,
            pub logo: Option<String>,
            pub metadata: Option<Json>,
            pub created_at: i64,
            pub updated_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod member {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_members")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub organization_id: String,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: String,
            pub role: String,
            pub created_at: i64,
            pub updated_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod invitation {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_invitations")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: String,
            pub organization_id: String,
            pub email: String,
            pub role: String,
            pub status: String,
            pub invited_by: String,
            pub expires_at: i64,
            pub created_at: i64,
            pub updated_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod subscription {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_subscriptions")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub organization_id: String,
            pub plan: String,
            pub status: String,
            pub trial_ends_at: i64,
            pub created_at: i64,
            pub updated_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod audit_entry {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_audit_log")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: String,
            pub event: String,
            pub org_id: String,
            pub actor_id: String,
            pub target_id: Option<String>,
            pub details: Option<String>,
            pub timestamp: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{audit_entry, invitation, member, organization, subscription};

/// Convert i64 to u64 safely (negative values become 0).
#[inline]
fn i64_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Convert u64 to i64 safely (values > i64::MAX become i64::MAX).
#[inline]
fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn db_err(err: DbErr) -> OrganizationError {
    OrganizationError::Storage(StockroomError::from(err))
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A stored value that no longer parses.
fn corrupt(err: impl Display) -> OrganizationError {
    OrganizationError::Storage(StockroomError::internal(format!(
        "corrupt tenancy row: {err}"
    )))
}

fn model_to_organization(model: organization::Model) -> Organization {
    Organization {
        id: model.id,
        name: model.name,
        slug: model.slug,
        logo: model.logo,
        metadata: model.metadata,
        created_at: i64_to_u64(model.created_at),
        updated_at: i64_to_u64(model.updated_at),
    }
}

fn model_to_member(model: member::Model) -> Result<Member> {
    Ok(Member {
        role: model.role.parse().map_err(corrupt)?,
        organization_id: model.organization_id,
        user_id: model.user_id,
        created_at: i64_to_u64(model.created_at),
        updated_at: i64_to_u64(model.updated_at),
    })
}

fn model_to_invitation(model: invitation::Model) -> Result<Invitation> {
    Ok(Invitation {
        role: model.role.parse().map_err(corrupt)?,
        status: model.status.parse().map_err(corrupt)?,
        id: model.id,
        organization_id: model.organization_id,
        email: model.email,
        invited_by: model.invited_by,
        expires_at: i64_to_u64(model.expires_at),
        created_at: i64_to_u64(model.created_at),
        updated_at: i64_to_u64(model.updated_at),
    })
}

fn model_to_subscription(model: subscription::Model) -> Result<Subscription> {
    Ok(Subscription {
        plan: model.plan.parse().map_err(corrupt)?,
        status: model.status.parse().map_err(corrupt)?,
        organization_id: model.organization_id,
        trial_ends_at: i64_to_u64(model.trial_ends_at),
        created_at: i64_to_u64(model.created_at),
        updated_at: i64_to_u64(model.updated_at),
    })
}

fn model_to_audit_entry(model: audit_entry::Model) -> Result<OrgAuditEntry> {
    Ok(OrgAuditEntry {
        event: model.event.parse().map_err(corrupt)?,
        id: model.id,
        org_id: model.org_id,
        actor_id: model.actor_id,
        target_id: model.target_id,
        details: model.details,
        timestamp: i64_to_u64(model.timestamp),
    })
}

fn member_active_model(m: &Member) -> member::ActiveModel {
    member::ActiveModel {
        organization_id: Set(m.organization_id.clone()),
        user_id: Set(m.user_id.clone()),
        role: Set(m.role.as_str().to_string()),
        created_at: Set(u64_to_i64(m.created_at)),
        updated_at: Set(u64_to_i64(m.updated_at)),
    }
}

fn invitation_active_model(inv: &Invitation) -> invitation::ActiveModel {
    invitation::ActiveModel {
        id: Set(inv.id.clone()),
        organization_id: Set(inv.organization_id.clone()),
        email: Set(inv.email.clone()),
        role: Set(inv.role.as_str().to_string()),
        status: Set(inv.status.as_str().to_string()),
        invited_by: Set(inv.invited_by.clone()),
        expires_at: Set(u64_to_i64(inv.expires_at)),
        created_at: Set(u64_to_i64(inv.created_at)),
        updated_at: Set(u64_to_i64(inv.updated_at)),
    }
}

/// SeaORM-backed store implementing every tenancy storage trait.
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::database::{DatabaseConfig, DatabaseConnection, TenancyMigrator, run_migrations};
/// use stockroom::organizations::SeaOrmTenancyStore;
///
/// let db = DatabaseConnection::connect(&DatabaseConfig::from_env()?).await?;
/// run_migrations::<TenancyMigrator>(&db).await?;
///
/// let store = SeaOrmTenancyStore::new(db.conn.clone());
/// ```
#[derive(Clone, Debug)]
pub struct SeaOrmTenancyStore {
    db: DatabaseConnection,
}

impl SeaOrmTenancyStore {
    /// Create a new SeaORM tenancy store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn begin(&self) -> Result<DatabaseTransaction> {
        self.db.begin().await.map_err(db_err)
    }

    /// Lock the organization row for the rest of `txn`.
    async fn lock_organization(&self, txn: &DatabaseTransaction, organization_id: &str) -> Result<bool> {
        let locked = organization::Entity::find_by_id(organization_id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?;
        Ok(locked.is_some())
    }

    async fn owner_count(&self, txn: &DatabaseTransaction, organization_id: &str) -> Result<u64> {
        member::Entity::find()
            .filter(member::Column::OrganizationId.eq(organization_id))
            .filter(member::Column::Role.eq(Role::Owner.as_str()))
            .count(txn)
            .await
            .map_err(db_err)
    }

    /// Load a member inside `txn`, check `actor` may act on them, and fail
    /// `LastOwner` if `new_role` (`None` for removal) would leave the
    /// organization without an owner.
    async fn guarded_member(
        &self,
        txn: &DatabaseTransaction,
        organization_id: &str,
        user_id: &str,
        actor: Option<Role>,
        new_role: Option<Role>,
    ) -> Result<Member> {
        if !self.lock_organization(txn, organization_id).await? {
            return Err(OrganizationError::member_not_found(user_id));
        }

        let model = member::Entity::find_by_id((organization_id.to_string(), user_id.to_string()))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| OrganizationError::member_not_found(user_id))?;
        let member = model_to_member(model)?;

        if let Some(actor) = actor {
            RoleGate::check_target(actor, member.role, new_role).into_result()?;
        }
        if member.role == Role::Owner
            && new_role != Some(Role::Owner)
            && self.owner_count(txn, organization_id).await? <= 1
        {
            return Err(OrganizationError::LastOwner);
        }

        Ok(member)
    }

    async fn locked_invitation(&self, txn: &DatabaseTransaction, id: &str) -> Result<Invitation> {
        let model = invitation::Entity::find_by_id(id)
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| OrganizationError::invitation_not_found(id))?;
        model_to_invitation(model)
    }

    async fn set_invitation_status(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
        status: InvitationStatus,
        now: u64,
    ) -> Result<()> {
        let result = invitation::Entity::update_many()
            .col_expr(invitation::Column::Status, Expr::value(status.as_str()))
            .col_expr(invitation::Column::UpdatedAt, Expr::value(u64_to_i64(now)))
            .filter(invitation::Column::Id.eq(id))
            .filter(invitation::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(OrganizationError::already_processed("not pending"));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for SeaOrmTenancyStore {
    async fn create_with_owner(
        &self,
        org: &Organization,
        owner: &Member,
        sub: &Subscription,
    ) -> Result<()> {
        tracing::debug!(org_id = %org.id, slug = %org.slug, "creating organization bundle");

        let txn = self.begin().await?;

        let org_model = organization::ActiveModel {
            id: Set(org.id.clone()),
            name: Set(org.name.clone()),
            slug: Set(org.slug.clone()),
            logo: Set(org.logo.clone()),
            metadata: Set(org.metadata.clone()),
            created_at: Set(u64_to_i64(org.created_at)),
            updated_at: Set(u64_to_i64(org.updated_at)),
        };
        organization::Entity::insert(org_model)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    OrganizationError::slug_taken(&org.slug)
                } else {
                    db_err(e)
                }
            })?;

        member::Entity::insert(member_active_model(owner))
            .exec_without_returning(&txn)
            .await
            .map_err(db_err)?;

        let sub_model = subscription::ActiveModel {
            organization_id: Set(sub.organization_id.clone()),
            plan: Set(sub.plan.as_str().to_string()),
            status: Set(sub.status.as_str().to_string()),
            trial_ends_at: Set(u64_to_i64(sub.trial_ends_at)),
            created_at: Set(u64_to_i64(sub.created_at)),
            updated_at: Set(u64_to_i64(sub.updated_at)),
        };
        subscription::Entity::insert(sub_model)
            .exec_without_returning(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Organization>> {
        tracing::debug!(org_id = %id, "finding organization by id");

        let org = organization::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(org.map(model_to_organization))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        tracing::debug!(slug = %slug, "finding organization by slug");

        let org = organization::Entity::find()
            .filter(organization::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(org.map(model_to_organization))
    }

    async fn update(&self, org: &Organization) -> Result<()> {
        tracing::debug!(org_id = %org.id, "updating organization");

        let result = organization::Entity::update_many()
            .col_expr(organization::Column::Name, Expr::value(org.name.clone()))
            .col_expr(organization::Column::Logo, Expr::value(org.logo.clone()))
            .col_expr(organization::Column::Metadata, Expr::value(org.metadata.clone()))
            .col_expr(
                organization::Column::UpdatedAt,
                Expr::value(u64_to_i64(org.updated_at)),
            )
            .filter(organization::Column::Id.eq(org.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(OrganizationError::not_found(&org.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        tracing::debug!(org_id = %id, "deleting organization");

        let txn = self.begin().await?;

        member::Entity::delete_many()
            .filter(member::Column::OrganizationId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        invitation::Entity::delete_many()
            .filter(invitation::Column::OrganizationId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        subscription::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let deleted = organization::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if deleted.rows_affected == 0 {
            return Err(OrganizationError::not_found(id));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<OrganizationSummary>> {
        tracing::debug!(user_id = %user_id, "listing organizations for user");

        let memberships = member::Entity::find()
            .filter(member::Column::UserId.eq(user_id))
            .order_by_asc(member::Column::CreatedAt)
            .order_by_asc(member::Column::OrganizationId)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        if memberships.is_empty() {
            return Ok(vec![]);
        }

        let org_ids: Vec<String> = memberships
            .iter()
            .map(|m| m.organization_id.clone())
            .collect();
        let mut orgs: HashMap<String, Organization> = organization::Entity::find()
            .filter(organization::Column::Id.is_in(org_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|model| (model.id.clone(), model_to_organization(model)))
            .collect();

        let mut summaries = Vec::with_capacity(memberships.len());
        for model in memberships {
            let Some(organization) = orgs.remove(&model.organization_id) else {
                continue;
            };
            let member_count = self.count_members(&organization.id).await?;
            let membership = model_to_member(model)?;
            summaries.push(OrganizationSummary {
                organization,
                role: membership.role,
                member_count,
                joined_at: membership.created_at,
            });
        }
        Ok(summaries)
    }

    async fn find_subscription(&self, organization_id: &str) -> Result<Option<Subscription>> {
        subscription::Entity::find_by_id(organization_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_subscription)
            .transpose()
    }
}

#[async_trait]
impl MembershipStore for SeaOrmTenancyStore {
    async fn find_member(&self, organization_id: &str, user_id: &str) -> Result<Option<Member>> {
        tracing::debug!(org_id = %organization_id, user_id = %user_id, "finding member");

        member::Entity::find_by_id((organization_id.to_string(), user_id.to_string()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_member)
            .transpose()
    }

    async fn list_members(&self, organization_id: &str) -> Result<Vec<Member>> {
        tracing::debug!(org_id = %organization_id, "listing members");

        member::Entity::find()
            .filter(member::Column::OrganizationId.eq(organization_id))
            .order_by_asc(member::Column::CreatedAt)
            .order_by_asc(member::Column::UserId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_member)
            .collect()
    }

    async fn count_with_role(&self, organization_id: &str, role: Role) -> Result<u64> {
        member::Entity::find()
            .filter(member::Column::OrganizationId.eq(organization_id))
            .filter(member::Column::Role.eq(role.as_str()))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn count_members(&self, organization_id: &str) -> Result<u64> {
        member::Entity::find()
            .filter(member::Column::OrganizationId.eq(organization_id))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn add_member(&self, m: &Member) -> Result<()> {
        tracing::debug!(
            org_id = %m.organization_id,
            user_id = %m.user_id,
            role = %m.role,
            "adding member"
        );

        member::Entity::insert(member_active_model(m))
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    OrganizationError::AlreadyMember
                } else {
                    db_err(e)
                }
            })?;
        Ok(())
    }

    async fn remove_member_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Option<Role>,
    ) -> Result<Member> {
        tracing::debug!(org_id = %organization_id, user_id = %user_id, "removing member");

        let txn = self.begin().await?;
        let member = self
            .guarded_member(&txn, organization_id, user_id, actor, None)
            .await?;

        member::Entity::delete_by_id((organization_id.to_string(), user_id.to_string()))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(member)
    }

    async fn change_role_guarded(
        &self,
        organization_id: &str,
        user_id: &str,
        actor: Role,
        role: Role,
        now: u64,
    ) -> Result<(Role, Member)> {
        tracing::debug!(
            org_id = %organization_id,
            user_id = %user_id,
            role = %role,
            "changing member role"
        );

        let txn = self.begin().await?;
        let mut member = self
            .guarded_member(&txn, organization_id, user_id, Some(actor), Some(role))
            .await?;
        let previous = member.role;
        if previous == role {
            return Ok((previous, member));
        }

        member::Entity::update_many()
            .col_expr(member::Column::Role, Expr::value(role.as_str()))
            .col_expr(member::Column::UpdatedAt, Expr::value(u64_to_i64(now)))
            .filter(member::Column::OrganizationId.eq(organization_id))
            .filter(member::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        member.role = role;
        member.updated_at = now;
        Ok((previous, member))
    }
}

#[async_trait]
impl InvitationStore for SeaOrmTenancyStore {
    async fn create_invitation(&self, inv: &Invitation) -> Result<()> {
        tracing::debug!(
            invitation_id = %inv.id,
            org_id = %inv.organization_id,
            "creating invitation"
        );

        if self.find_by_id(&inv.organization_id).await?.is_none() {
            return Err(OrganizationError::not_found(&inv.organization_id));
        }

        invitation::Entity::insert(invitation_active_model(inv))
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn create_or_get_open_invitation(
        &self,
        inv: &Invitation,
        now: u64,
    ) -> Result<(Invitation, bool)> {
        tracing::debug!(
            invitation_id = %inv.id,
            org_id = %inv.organization_id,
            "creating invitation unless one is open"
        );

        let txn = self.begin().await?;
        if !self.lock_organization(&txn, &inv.organization_id).await? {
            return Err(OrganizationError::not_found(&inv.organization_id));
        }

        let open = invitation::Entity::find()
            .filter(invitation::Column::OrganizationId.eq(inv.organization_id.as_str()))
            .filter(invitation::Column::Email.eq(inv.email.as_str()))
            .filter(invitation::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .filter(invitation::Column::ExpiresAt.gt(u64_to_i64(now)))
            .order_by_asc(invitation::Column::CreatedAt)
            .one(&txn)
            .await
            .map_err(db_err)?;
        if let Some(model) = open {
            return Ok((model_to_invitation(model)?, false));
        }

        invitation::Entity::insert(invitation_active_model(inv))
            .exec_without_returning(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok((inv.clone(), true))
    }

    async fn find_invitation(&self, id: &str) -> Result<Option<Invitation>> {
        tracing::debug!(invitation_id = %id, "finding invitation by id");

        invitation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_invitation)
            .transpose()
    }

    async fn list_pending(&self, organization_id: &str, now: u64) -> Result<Vec<Invitation>> {
        tracing::debug!(org_id = %organization_id, "listing pending invitations");

        invitation::Entity::find()
            .filter(invitation::Column::OrganizationId.eq(organization_id))
            .filter(invitation::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .filter(invitation::Column::ExpiresAt.gt(u64_to_i64(now)))
            .order_by_asc(invitation::Column::CreatedAt)
            .order_by_asc(invitation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_invitation)
            .collect()
    }

    async fn accept_invitation(
        &self,
        id: &str,
        user_id: &str,
        now: u64,
    ) -> Result<(Invitation, Member)> {
        tracing::debug!(invitation_id = %id, user_id = %user_id, "accepting invitation");

        let txn = self.begin().await?;
        let mut invitation = self.locked_invitation(&txn, id).await?;

        match invitation.status {
            InvitationStatus::Pending if invitation.is_expired_at(now) => {
                return Err(OrganizationError::InvitationExpired);
            }
            InvitationStatus::Pending => {}
            InvitationStatus::Expired => return Err(OrganizationError::InvitationExpired),
            status @ (InvitationStatus::Accepted | InvitationStatus::Cancelled) => {
                return Err(OrganizationError::already_processed(status));
            }
        }

        if !self
            .lock_organization(&txn, &invitation.organization_id)
            .await?
        {
            return Err(OrganizationError::invitation_not_found(id));
        }

        let member = Member {
            organization_id: invitation.organization_id.clone(),
            user_id: user_id.to_string(),
            role: invitation.role,
            created_at: now,
            updated_at: now,
        };
        member::Entity::insert(member_active_model(&member))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    OrganizationError::AlreadyMember
                } else {
                    db_err(e)
                }
            })?;

        self.set_invitation_status(&txn, id, InvitationStatus::Accepted, now)
            .await?;
        txn.commit().await.map_err(db_err)?;

        invitation.status = InvitationStatus::Accepted;
        invitation.updated_at = now;
        Ok((invitation, member))
    }

    async fn cancel_invitation(
        &self,
        organization_id: &str,
        id: &str,
        now: u64,
    ) -> Result<Invitation> {
        tracing::debug!(invitation_id = %id, org_id = %organization_id, "cancelling invitation");

        let txn = self.begin().await?;
        let mut invitation = self.locked_invitation(&txn, id).await?;

        if invitation.organization_id != organization_id {
            return Err(OrganizationError::invitation_not_found(id));
        }
        if invitation.status != InvitationStatus::Pending {
            return Err(OrganizationError::already_processed(invitation.status));
        }

        self.set_invitation_status(&txn, id, InvitationStatus::Cancelled, now)
            .await?;
        txn.commit().await.map_err(db_err)?;

        invitation.status = InvitationStatus::Cancelled;
        invitation.updated_at = now;
        Ok(invitation)
    }

    async fn expire_stale(&self, now: u64) -> Result<u64> {
        let result = invitation::Entity::update_many()
            .col_expr(
                invitation::Column::Status,
                Expr::value(InvitationStatus::Expired.as_str()),
            )
            .col_expr(invitation::Column::UpdatedAt, Expr::value(u64_to_i64(now)))
            .filter(invitation::Column::Status.eq(InvitationStatus::Pending.as_str()))
            .filter(invitation::Column::ExpiresAt.lte(u64_to_i64(now)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected > 0 {
            tracing::debug!(count = result.rows_affected, "expired stale invitations");
        }
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl OrgAuditStore for SeaOrmTenancyStore {
    async fn record_audit(&self, entry: &OrgAuditEntry) -> Result<()> {
        let model = audit_entry::ActiveModel {
            id: Set(entry.id.clone()),
            event: Set(entry.event.as_str().to_string()),
            org_id: Set(entry.org_id.clone()),
            actor_id: Set(entry.actor_id.clone()),
            target_id: Set(entry.target_id.clone()),
            details: Set(entry.details.clone()),
            timestamp: Set(u64_to_i64(entry.timestamp)),
        };
        audit_entry::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn org_audit_log(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<OrgAuditEntry>> {
        audit_entry::Entity::find()
            .filter(audit_entry::Column::OrgId.eq(organization_id))
            .order_by_desc(audit_entry::Column::Timestamp)
            .limit(limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_audit_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organizations::types::{Plan, SubscriptionStatus};
    use crate::testing::TestDb;

    #[test]
    fn test_safe_integer_conversions() {
        assert_eq!(i64_to_u64(100), 100);
        assert_eq!(i64_to_u64(-1), 0);
        assert_eq!(i64_to_u64(i64::MAX), i64::MAX as u64);

        assert_eq!(u64_to_i64(100), 100);
        assert_eq!(u64_to_i64(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_unknown_role_is_a_storage_error() {
        let model = member::Model {
            organization_id: "org_1".to_string(),
            user_id: "u1".to_string(),
            role: "superuser".to_string(),
            created_at: 1,
            updated_at: 1,
        };
        let err = model_to_member(model).unwrap_err();
        assert!(matches!(err, OrganizationError::Storage(_)));
    }

    fn bundle(id: &str, slug: &str, user_id: &str) -> (Organization, Member, Subscription) {
        (
            Organization {
                id: id.to_string(),
                name: slug.to_string(),
                slug: slug.to_string(),
                logo: None,
                metadata: None,
                created_at: 10,
                updated_at: 10,
            },
            Member {
                organization_id: id.to_string(),
                user_id: user_id.to_string(),
                role: Role::Owner,
                created_at: 10,
                updated_at: 10,
            },
            Subscription {
                organization_id: id.to_string(),
                plan: Plan::Free,
                status: SubscriptionStatus::Trial,
                trial_ends_at: 100,
                created_at: 10,
                updated_at: 10,
            },
        )
    }

    async fn store_with_org() -> SeaOrmTenancyStore {
        let db = TestDb::new().await.unwrap();
        let store = SeaOrmTenancyStore::new(db.connection());
        let (org, owner, sub) = bundle("org_1", "acme", "u1");
        store.create_with_owner(&org, &owner, &sub).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_bundle_is_written_and_slug_is_unique() {
        let store = store_with_org().await;

        let member = store.find_member("org_1", "u1").await.unwrap().unwrap();
        assert_eq!(member.role, Role::Owner);
        let sub = store.find_subscription("org_1").await.unwrap().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trial);

        let (org, owner, sub) = bundle("org_2", "acme", "u2");
        let err = store.create_with_owner(&org, &owner, &sub).await.unwrap_err();
        assert!(matches!(err, OrganizationError::SlugTaken { .. }));
        assert!(store.find_member("org_2", "u2").await.unwrap().is_none());
        assert!(store.find_subscription("org_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_owner_guard() {
        let store = store_with_org().await;

        let err = store
            .remove_member_guarded("org_1", "u1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::LastOwner));
        let err = store
            .change_role_guarded("org_1", "u1", Role::Owner, Role::Admin, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::LastOwner));

        store
            .add_member(&Member {
                organization_id: "org_1".to_string(),
                user_id: "u2".to_string(),
                role: Role::Member,
                created_at: 11,
                updated_at: 11,
            })
            .await
            .unwrap();

        let err = store
            .change_role_guarded("org_1", "u2", Role::Admin, Role::Owner, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let (previous, _) = store
            .change_role_guarded("org_1", "u2", Role::Owner, Role::Owner, 20)
            .await
            .unwrap();
        assert_eq!(previous, Role::Member);

        let err = store
            .remove_member_guarded("org_1", "u2", Some(Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, OrganizationError::RoleRequired { .. }));

        let removed = store
            .remove_member_guarded("org_1", "u1", Some(Role::Owner))
            .await
            .unwrap();
        assert_eq!(removed.user_id, "u1");
        assert_eq!(store.count_with_role("org_1", Role::Owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_accept_is_single_use() {
        let store = store_with_org().await;
        store
            .create_invitation(&Invitation {
                id: "inv_1".to_string(),
                organization_id: "org_1".to_string(),
                email: "bob@x.com".to_string(),
                role: Role::Admin,
                status: InvitationStatus::Pending,
                invited_by: "u1".to_string(),
                expires_at: 1_000,
                created_at: 10,
                updated_at: 10,
            })
            .await
            .unwrap();

        let (invitation, member) = store.accept_invitation("inv_1", "u2", 50).await.unwrap();
        assert_eq!(invitation.status, InvitationStatus::Accepted);
        assert_eq!(member.role, Role::Admin);

        let err = store.accept_invitation("inv_1", "u3", 60).await.unwrap_err();
        assert!(matches!(err, OrganizationError::AlreadyProcessed { .. }));
        assert!(store.find_member("org_1", "u3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = store_with_org().await;
        store.delete("org_1").await.unwrap();

        assert!(store.find_by_id("org_1").await.unwrap().is_none());
        assert!(store.find_member("org_1", "u1").await.unwrap().is_none());
        assert!(store.find_subscription("org_1").await.unwrap().is_none());
        assert!(matches!(
            store.delete("org_1").await.unwrap_err(),
            OrganizationError::NotFound { .. }
        ));
    }
}
