use crate::error::{Result, StockroomError};
use sea_orm_migration::{MigrationTrait, MigratorTrait};

use super::m20250101_000001_create_tenancy_tables;

/// Migrator for the tables used by
/// [`SeaOrmTenancyStore`](crate::organizations::SeaOrmTenancyStore).
pub struct TenancyMigrator;

#[async_trait::async_trait]
impl MigratorTrait for TenancyMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_tenancy_tables::Migration)]
    }
}

/// Run pending migrations
///
/// # Example
///
/// ```rust,ignore
/// use stockroom::database::{TenancyMigrator, run_migrations};
///
/// run_migrations::<TenancyMigrator>(&db).await?;
/// ```
pub async fn run_migrations<M: MigratorTrait>(db: &sea_orm::DatabaseConnection) -> Result<()> {
    M::up(db, None)
        .await
        .map_err(|e| StockroomError::internal(format!("Migration failed: {}", e)))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Rollback the last `steps` migrations (one when `None`)
pub async fn rollback_migration<M: MigratorTrait>(
    db: &sea_orm::DatabaseConnection,
    steps: Option<u32>,
) -> Result<()> {
    M::down(db, steps)
        .await
        .map_err(|e| StockroomError::internal(format!("Rollback failed: {}", e)))?;

    tracing::info!(steps = steps.unwrap_or(1), "Rolled back migrations");
    Ok(())
}
