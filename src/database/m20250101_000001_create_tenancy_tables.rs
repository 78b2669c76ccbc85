//! Tenancy tables: organizations, members, invitations, subscriptions and
//! the audit log.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(string(Organizations::Id).primary_key())
                    .col(string(Organizations::Name))
                    .col(string(Organizations::Slug).unique_key())
                    .col(string_null(Organizations::Logo))
                    .col(json_null(Organizations::Metadata))
                    .col(big_integer(Organizations::CreatedAt))
                    .col(big_integer(Organizations::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationMembers::Table)
                    .if_not_exists()
                    .col(string(OrganizationMembers::OrganizationId))
                    .col(string(OrganizationMembers::UserId))
                    .col(string(OrganizationMembers::Role))
                    .col(big_integer(OrganizationMembers::CreatedAt))
                    .col(big_integer(OrganizationMembers::UpdatedAt))
                    .primary_key(
                        Index::create()
                            .col(OrganizationMembers::OrganizationId)
                            .col(OrganizationMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_members_organization")
                            .from(OrganizationMembers::Table, OrganizationMembers::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Organization listing walks memberships by user.
        manager
            .create_index(
                Index::create()
                    .name("idx_organization_members_user")
                    .table(OrganizationMembers::Table)
                    .col(OrganizationMembers::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationInvitations::Table)
                    .if_not_exists()
                    .col(string(OrganizationInvitations::Id).primary_key())
                    .col(string(OrganizationInvitations::OrganizationId))
                    .col(string(OrganizationInvitations::Email))
                    .col(string(OrganizationInvitations::Role))
                    .col(string(OrganizationInvitations::Status))
                    .col(string(OrganizationInvitations::InvitedBy))
                    .col(big_integer(OrganizationInvitations::ExpiresAt))
                    .col(big_integer(OrganizationInvitations::CreatedAt))
                    .col(big_integer(OrganizationInvitations::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_invitations_organization")
                            .from(
                                OrganizationInvitations::Table,
                                OrganizationInvitations::OrganizationId,
                            )
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_organization_invitations_org_email")
                    .table(OrganizationInvitations::Table)
                    .col(OrganizationInvitations::OrganizationId)
                    .col(OrganizationInvitations::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationSubscriptions::Table)
                    .if_not_exists()
                    .col(string(OrganizationSubscriptions::OrganizationId).primary_key())
                    .col(string(OrganizationSubscriptions::Plan))
                    .col(string(OrganizationSubscriptions::Status))
                    .col(big_integer(OrganizationSubscriptions::TrialEndsAt))
                    .col(big_integer(OrganizationSubscriptions::CreatedAt))
                    .col(big_integer(OrganizationSubscriptions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organization_subscriptions_organization")
                            .from(
                                OrganizationSubscriptions::Table,
                                OrganizationSubscriptions::OrganizationId,
                            )
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // No foreign key: audit entries outlive the organization.
        manager
            .create_table(
                Table::create()
                    .table(OrganizationAuditLog::Table)
                    .if_not_exists()
                    .col(string(OrganizationAuditLog::Id).primary_key())
                    .col(string(OrganizationAuditLog::Event))
                    .col(string(OrganizationAuditLog::OrgId))
                    .col(string(OrganizationAuditLog::ActorId))
                    .col(string_null(OrganizationAuditLog::TargetId))
                    .col(text_null(OrganizationAuditLog::Details))
                    .col(big_integer(OrganizationAuditLog::Timestamp))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_organization_audit_log_org")
                    .table(OrganizationAuditLog::Table)
                    .col(OrganizationAuditLog::OrgId)
                    .col(OrganizationAuditLog::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrganizationAuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizationSubscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizationInvitations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizationMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    Slug,
    Logo,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationMembers {
    Table,
    OrganizationId,
    UserId,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationInvitations {
    Table,
    Id,
    OrganizationId,
    Email,
    Role,
    Status,
    InvitedBy,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationSubscriptions {
    Table,
    OrganizationId,
    Plan,
    Status,
    TrialEndsAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrganizationAuditLog {
    Table,
    Id,
    Event,
    OrgId,
    ActorId,
    TargetId,
    Details,
    Timestamp,
}
