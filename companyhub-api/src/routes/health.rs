//! Health check endpoint
//!
//! ```text
//! GET /healthy
//! ```
//!
//! Always 200 while the process is serving; the body says whether the
//! database answered.
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "database": "connected",
//!   "pool": { "activeConnections": 1, "idleConnections": 4, "totalConnections": 5 }
//! }
//! ```

use crate::app::AppState;
use axum::{extract::State, Json};
use companyhub_shared::db::pool::{get_pool_stats, health_check as ping, PoolStats};
use serde::Serialize;
use tracing::warn;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,

    /// Application version
    pub version: &'static str,

    /// `connected` or `disconnected`
    pub database: &'static str,

    /// Connection pool usage
    pub pool: PoolStats,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match ping(&state.db).await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
        pool: get_pool_stats(&state.db),
    })
}
