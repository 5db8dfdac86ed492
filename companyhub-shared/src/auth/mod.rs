//! Authentication and authorization for Company Hub
//!
//! Every protected request passes through one linear pipeline:
//!
//! 1. [`extract`]: pull the access token from the cookie or bearer header
//! 2. [`jwt`]: verify the token
//! 3. [`identity`]: load the user and their memberships
//! 4. [`guard`]: require an active company the user belongs to
//! 5. [`roles`]: check the route's declared roles
//!
//! [`middleware`] wires the pipeline into axum, and [`password`] hashes and
//! verifies credentials for login.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{handler::Handler, middleware, routing::patch, Router};
//! use chrono::Duration;
//! use companyhub_shared::auth::identity::MemoryIdentityStore;
//! use companyhub_shared::auth::jwt::TokenService;
//! use companyhub_shared::auth::middleware::{require_roles, tenancy_guard, AuthState};
//! use companyhub_shared::models::membership::MembershipRole;
//!
//! const ADMINS: &[MembershipRole] = &[MembershipRole::Owner, MembershipRole::Admin];
//!
//! let auth = AuthState::new(
//!     TokenService::new("a-secret-that-is-at-least-32-bytes!!", Duration::days(1)),
//!     Arc::new(MemoryIdentityStore::new()),
//! );
//!
//! let app: Router = Router::new()
//!     .route(
//!         "/companies/:id",
//!         patch((|| async { "updated" }).layer(middleware::from_fn(require_roles(ADMINS)))),
//!     )
//!     .route_layer(middleware::from_fn_with_state(auth, tenancy_guard));
//! ```

pub mod extract;
pub mod guard;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;

use thiserror::Error;

use identity::{ResolveError, StoreError};

/// Rejections produced by the request pipeline
///
/// All variants are terminal for the request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid token, or the token's user no longer exists
    #[error("Authentication required")]
    Unauthenticated,

    #[error("No active company selected")]
    NoActiveCompany,

    #[error("User is not a member of the active company")]
    NotAMember,

    #[error("Insufficient role for this action")]
    InsufficientRole,

    /// Identity could not be loaded
    #[error("Identity store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Machine-readable error code used in response bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthorized",
            AuthError::NoActiveCompany => "no_active_company",
            AuthError::NotAMember => "not_a_member",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::Store(_) => "internal_error",
        }
    }
}

impl From<ResolveError> for AuthError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UserNotFound => AuthError::Unauthenticated,
            ResolveError::Store(e) => AuthError::Store(e),
        }
    }
}
