use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use stockroom::email::ConsoleMailer;
use stockroom::organizations::{
    InMemoryTenancyStore, InvitationManager, OrgAuditStore, TenancyServices, TenancyStore, routes,
};
use stockroom::session::{InMemorySessionStore, SessionIdentityResolver};
use stockroom::{Config, ConfigBuilder};
use tracing::{info, warn};

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .from_env()
        .build()
        .context("invalid configuration")?;
    stockroom::init_tracing_with_config(&config);

    #[cfg(feature = "database")]
    let config = match connect_database().await? {
        Some(store) => return serve(store, config).await,
        None => config,
    };

    warn!("DATABASE_URL not set, using the in-memory store");
    serve(InMemoryTenancyStore::new(), config).await
}

/// The SeaORM store, when `DATABASE_URL` is set.
#[cfg(feature = "database")]
async fn connect_database() -> anyhow::Result<Option<stockroom::organizations::SeaOrmTenancyStore>> {
    use stockroom::database::{DatabaseConfig, DatabaseConnection, TenancyMigrator, run_migrations};

    let Some(db_config) = DatabaseConfig::from_env() else {
        return Ok(None);
    };
    let db = DatabaseConnection::connect(&db_config).await?;
    if db_config.auto_migrate {
        run_migrations::<TenancyMigrator>(&db.conn).await?;
    }
    Ok(Some(stockroom::organizations::SeaOrmTenancyStore::new(db.conn)))
}

async fn serve<S>(store: S, config: Config) -> anyhow::Result<()>
where
    S: TenancyStore + OrgAuditStore,
{
    let sessions = SessionIdentityResolver::new(InMemorySessionStore::new(), config.session.clone());
    let mailer = Arc::new(ConsoleMailer::new());

    let sweeper = InvitationManager::new(store.clone(), store.clone(), config.invitations.clone());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.expire_stale_invitations().await {
                warn!(error = %e, "Invitation expiry sweep failed");
            }
        }
    });

    let services = TenancyServices::new(
        store.clone(),
        config.organizations.clone(),
        config.invitations.clone(),
    )
    .with_mailer(mailer);
    let app = routes::router(store, sessions, services);

    let addr = config.server.addr().context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Stockroom listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
