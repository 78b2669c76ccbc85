//! Stockroom - organization-scoped multi-tenancy for axum services
//!
//! Stockroom answers two questions for every tenant-scoped request: which
//! organization is the caller acting in, and may they do this there. It
//! also manages the lifecycle that keeps those answers true.
//!
//! # Features
//!
//! - **Identity**: pluggable [`auth::IdentityResolver`], session-backed by default
//! - **Organization context**: the `X-Organization-Id` claim, verified on every request
//! - **Role gate**: owner / admin / member checks as middleware or in handlers
//! - **Lifecycle**: create, update, delete, members, invitations
//! - **Storage**: in-memory, or SeaORM on Postgres/SQLite (feature `database`)
//! - **Testing**: fluent HTTP scenarios and migrated test databases
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stockroom::organizations::{InMemoryTenancyStore, TenancyServices, routes};
//! use stockroom::session::{InMemorySessionStore, SessionIdentityResolver};
//! use stockroom::ConfigBuilder;
//!
//! #[tokio::main]
//! async fn main() -> stockroom::Result<()> {
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     stockroom::init_tracing_with_config(&config);
//!
//!     let store = InMemoryTenancyStore::new();
//!     let sessions =
//!         SessionIdentityResolver::new(InMemorySessionStore::new(), config.session.clone());
//!     let services = TenancyServices::new(
//!         store.clone(),
//!         config.organizations.clone(),
//!         config.invitations.clone(),
//!     );
//!     let app = routes::router(store, sessions, services);
//!
//!     let addr = config.server.addr().map_err(|e| stockroom::StockroomError::internal(e.to_string()))?;
//!     let listener = tokio::net::TcpListener::bind(addr)
//!         .await
//!         .map_err(|e| stockroom::StockroomError::internal(e.to_string()))?;
//!     axum::serve(listener, app)
//!         .await
//!         .map_err(|e| stockroom::StockroomError::internal(e.to_string()))?;
//!     Ok(())
//! }
//! ```

pub mod auth;
mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod email;
mod error;
pub mod organizations;
pub mod session;
pub mod testing;
pub mod traits;
pub mod utils;

pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use error::{ErrorResponse, Result, StockroomError};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call early in `main`, before building the router.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "stockroom=debug")
/// - `STOCKROOM_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing from [`LoggingConfig`]
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install(env_filter, config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
