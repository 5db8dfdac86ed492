//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use companyhub_api::{app::{build_router, AppState}, config::Config};
//! use companyhub_shared::auth::identity::PgIdentityStore;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let identities = Arc::new(PgIdentityStore::new(pool.clone()));
//! let app = build_router(AppState::new(pool, config, identities));
//! # Ok(())
//! # }
//! ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    handler::Handler,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use companyhub_shared::auth::{
    identity::IdentityStore,
    jwt::TokenService,
    middleware::{require_auth, require_roles, tenancy_guard, AuthState},
    roles::{OWNER_ONLY, OWNER_OR_ADMIN},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token service and identity store used by the guards
    pub auth: AuthState,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, identities: Arc<dyn IdentityStore>) -> Self {
        let tokens = TokenService::new(&config.jwt.secret, config.jwt.expires_in);

        Self {
            db,
            config: Arc::new(config),
            auth: AuthState::new(tokens, identities),
        }
    }

    /// Token service for signing session tokens
    pub fn tokens(&self) -> &TokenService {
        &self.auth.tokens
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /healthy                          public
/// /api/auth/{signup,login,logout}   public
/// /api/auth/me                      login required
/// /api/users                        POST public, rest login required
/// /api/companies                    tenancy guard (POST / bypasses)
/// /api/memberships                  tenancy guard
/// /api/invites                      tenancy guard (POST /accept bypasses)
/// ```
///
/// Guarded groups keep their full paths and are merged, not nested: nesting
/// strips the prefix from the URI the guard inspects.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, tracing, then the per-group
/// guards and the per-route role gates.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/healthy", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/users", post(routes::users::create_user));

    let account_routes = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/users", get(routes::users::list_users))
        .route(
            "/api/users/:id",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route_layer(from_fn_with_state(state.auth.clone(), require_auth));

    let company_routes = Router::new()
        .route(
            "/api/companies",
            post(routes::companies::create_company).get(routes::companies::list_companies),
        )
        .route(
            "/api/companies/:id",
            get(routes::companies::get_company)
                .patch(
                    routes::companies::update_company
                        .layer(from_fn(require_roles(OWNER_OR_ADMIN))),
                )
                .delete(
                    routes::companies::delete_company.layer(from_fn(require_roles(OWNER_ONLY))),
                ),
        )
        .route(
            "/api/companies/:id/select",
            post(routes::companies::select_company),
        );

    let membership_routes = Router::new()
        .route(
            "/api/memberships",
            post(
                routes::memberships::create_membership
                    .layer(from_fn(require_roles(OWNER_OR_ADMIN))),
            )
            .get(routes::memberships::list_memberships),
        )
        .route(
            "/api/memberships/:id",
            get(routes::memberships::get_membership)
                .patch(
                    routes::memberships::update_membership
                        .layer(from_fn(require_roles(OWNER_OR_ADMIN))),
                )
                .delete(
                    routes::memberships::delete_membership
                        .layer(from_fn(require_roles(OWNER_OR_ADMIN))),
                ),
        );

    let invite_routes = Router::new()
        .route(
            "/api/invites",
            post(routes::invites::create_invite.layer(from_fn(require_roles(OWNER_OR_ADMIN))))
                .get(routes::invites::list_invites),
        )
        .route("/api/invites/accept", post(routes::invites::accept_invite))
        .route(
            "/api/invites/token/:token",
            get(routes::invites::get_invite_by_token),
        )
        .route(
            "/api/invites/:id",
            get(routes::invites::get_invite).delete(
                routes::invites::delete_invite.layer(from_fn(require_roles(OWNER_OR_ADMIN))),
            ),
        );

    let tenant_routes = Router::new()
        .merge(company_routes)
        .merge(membership_routes)
        .merge(invite_routes)
        .route_layer(from_fn_with_state(state.auth.clone(), tenancy_guard));

    Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .merge(account_routes)
        .merge(tenant_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS for the configured frontend origin
///
/// Credentials are allowed so the browser sends the auth cookie. Without a
/// configured origin no cross-origin request is allowed.
fn cors_layer(config: &Config) -> CorsLayer {
    let Some(frontend_url) = config.api.frontend_url.as_deref() else {
        return CorsLayer::new();
    };

    let origin = match frontend_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            warn!(frontend_url, error = %e, "FRONTEND_URL is not a valid origin, CORS disabled");
            return CorsLayer::new();
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
