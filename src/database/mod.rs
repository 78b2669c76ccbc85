//! Database connection and schema management for the SeaORM tenancy store.

pub mod config;
pub mod connection;
mod m20250101_000001_create_tenancy_tables;
pub mod migration;

pub use config::{DatabaseConfig, redact_database_url};
pub use connection::DatabaseConnection;
pub use migration::{TenancyMigrator, rollback_migration, run_migrations};
pub use sea_orm;
