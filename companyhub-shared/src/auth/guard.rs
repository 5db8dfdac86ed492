//! Tenancy guard
//!
//! Turns a verified token into an [`AuthenticatedIdentity`] scoped to the
//! user's active company. Two routes are allowed through without an active
//! company or membership, because they are how a user gets one:
//!
//! - accepting an invite (`.../invites/accept`)
//! - creating a company (`POST .../companies`)
//!
//! On those routes the identity carries no role.

use axum::http::{HeaderMap, Method};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::extract::extract_token;
use super::identity::{resolve, IdentitySnapshot, IdentityStore};
use super::jwt::TokenService;
use super::AuthError;
use crate::models::membership::MembershipRole;

/// The parts of a request the guard looks at
#[derive(Debug, Clone, Copy)]
pub struct RouteInfo<'a> {
    pub method: &'a Method,
    pub path: &'a str,
}

impl<'a> RouteInfo<'a> {
    pub fn new(method: &'a Method, path: &'a str) -> Self {
        Self { method, path }
    }
}

/// The caller of the current request
///
/// Built fresh for every request and never persisted. `role` is the caller's
/// role in `active_company_id`, read during this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub active_company_id: Option<Uuid>,
    pub role: Option<MembershipRole>,
}

impl AuthenticatedIdentity {
    /// Identity for routes that need a login but no tenancy check
    ///
    /// The role is filled in when the user is a member of their active company.
    pub fn unscoped(snapshot: &IdentitySnapshot) -> Self {
        let active_company_id = snapshot.user.active_company_id;

        Self {
            user_id: snapshot.user.id,
            email: snapshot.user.email.clone(),
            active_company_id,
            role: active_company_id
                .and_then(|id| snapshot.membership_in(id))
                .map(|membership| membership.role),
        }
    }

    /// The active company, for handlers that operate inside it
    pub fn company_id(&self) -> Result<Uuid, AuthError> {
        self.active_company_id.ok_or(AuthError::NoActiveCompany)
    }
}

fn path_segments(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// True if the path ends with the segments `invites/accept`
pub fn is_invite_accept_route(path: &str) -> bool {
    path_segments(path).ends_with(&["invites", "accept"])
}

/// True if the path's last segment is `companies`
pub fn is_company_create_route(path: &str) -> bool {
    path_segments(path).last() == Some(&"companies")
}

/// True if the route may proceed without an active company or membership
pub fn is_bypass_route(route: &RouteInfo<'_>) -> bool {
    is_invite_accept_route(route.path)
        || (*route.method == Method::POST && is_company_create_route(route.path))
}

/// Verifies the request's token and loads the caller's identity snapshot
///
/// # Errors
///
/// `Unauthenticated` when no token is present, the token is invalid, or its
/// user no longer exists. `Store` when the identity could not be loaded.
pub async fn authenticate(
    tokens: &TokenService,
    store: &dyn IdentityStore,
    headers: &HeaderMap,
) -> Result<IdentitySnapshot, AuthError> {
    let token = extract_token(headers).ok_or_else(|| {
        debug!("No access token on request");
        AuthError::Unauthenticated
    })?;

    let claims = tokens
        .verify(&token)
        .map_err(|_| AuthError::Unauthenticated)?;

    let snapshot = resolve(store, claims.sub).await.map_err(|e| {
        debug!(user_id = %claims.sub, error = %e, "Token subject could not be resolved");
        AuthError::from(e)
    })?;

    Ok(snapshot)
}

/// Scopes an authenticated caller to their active company
///
/// # Errors
///
/// - `NoActiveCompany` if the user has none and the route is not a bypass
/// - `NotAMember` if the user has no membership in it and the route is not a
///   bypass
pub fn authorize(
    snapshot: &IdentitySnapshot,
    route: &RouteInfo<'_>,
) -> Result<AuthenticatedIdentity, AuthError> {
    let bypass = is_bypass_route(route);
    let user = &snapshot.user;

    let active_company_id = match user.active_company_id {
        Some(id) => Some(id),
        None if bypass => None,
        None => {
            debug!(user_id = %user.id, path = route.path, "Rejected: no active company");
            return Err(AuthError::NoActiveCompany);
        }
    };

    let membership = active_company_id.and_then(|id| snapshot.membership_in(id));

    if membership.is_none() && !bypass {
        debug!(
            user_id = %user.id,
            company_id = ?active_company_id,
            path = route.path,
            "Rejected: not a member of active company"
        );
        return Err(AuthError::NotAMember);
    }

    Ok(AuthenticatedIdentity {
        user_id: user.id,
        email: user.email.clone(),
        active_company_id,
        role: membership.map(|m| m.role),
    })
}

/// Runs the whole guard: extraction, verification, resolution, tenancy
pub async fn guard_request(
    tokens: &TokenService,
    store: &dyn IdentityStore,
    headers: &HeaderMap,
    route: &RouteInfo<'_>,
) -> Result<AuthenticatedIdentity, AuthError> {
    let snapshot = authenticate(tokens, store, headers).await?;
    authorize(&snapshot, route)
}
