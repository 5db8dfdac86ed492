//! # Company Hub API Server
//!
//! Multi-tenant company hub: accounts, companies, memberships and invites,
//! with every tenant-scoped request checked against the caller's active
//! company.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p companyhub-api
//! ```

use std::sync::Arc;

use companyhub_api::app::{build_router, AppState};
use companyhub_api::config::Config;
use companyhub_shared::auth::identity::PgIdentityStore;
use companyhub_shared::db::{
    migrations::{migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the log filter is read
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "companyhub_api=debug,companyhub_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Company Hub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;

    run_migrations(&pool).await?;
    let status = migration_status(&pool).await?;
    tracing::info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Database schema is up to date"
    );

    let bind_address = config.bind_address();
    let identities = Arc::new(PgIdentityStore::new(pool.clone()));
    let app = build_router(AppState::new(pool.clone(), config, identities));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
