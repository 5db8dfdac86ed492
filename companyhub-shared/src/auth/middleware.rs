//! Axum wiring for the authentication pipeline
//!
//! - [`tenancy_guard`]: full guard, attaches an [`AuthenticatedIdentity`]
//!   scoped to the active company
//! - [`require_auth`]: login only, for routes that work without a tenant
//! - [`require_roles`]: per-route role gate, layered inside the guard
//!
//! Handlers receive the caller by taking [`AuthenticatedIdentity`] as an
//! extractor argument.
//!
//! # Example
//!
//! ```no_run
//! use axum::{middleware, routing::get, Router};
//! use companyhub_shared::auth::guard::AuthenticatedIdentity;
//! use companyhub_shared::auth::middleware::{tenancy_guard, AuthState};
//!
//! async fn whoami(identity: AuthenticatedIdentity) -> String {
//!     format!("{} in {:?}", identity.email, identity.active_company_id)
//! }
//!
//! fn router(auth: AuthState) -> Router {
//!     Router::new()
//!         .route("/whoami", get(whoami))
//!         .route_layer(middleware::from_fn_with_state(auth, tenancy_guard))
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::guard::{authenticate, guard_request, AuthenticatedIdentity, RouteInfo};
use super::identity::IdentityStore;
use super::jwt::TokenService;
use super::roles::allow;
use super::AuthError;
use crate::models::membership::MembershipRole;

/// Everything the guard needs, shared across requests
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenService>,
    pub identities: Arc<dyn IdentityStore>,
}

impl AuthState {
    pub fn new(tokens: TokenService, identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            tokens: Arc::new(tokens),
            identities,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::NoActiveCompany | AuthError::NotAMember | AuthError::InsufficientRole => {
                StatusCode::FORBIDDEN
            }
            AuthError::Store(e) => {
                error!(error = %e, "Identity store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AuthError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": self.code(), "message": message }))).into_response()
    }
}

/// Tenancy guard middleware
///
/// Rejects with 401 when the caller is not authenticated and 403 when they
/// have no active company or are not a member of it, except on the invite
/// accept and company create routes.
pub async fn tenancy_guard(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Request bodies are not Sync; only the head is borrowed across the await
    let (mut parts, body) = req.into_parts();

    let route = RouteInfo::new(&parts.method, parts.uri.path());
    let identity =
        guard_request(&auth.tokens, auth.identities.as_ref(), &parts.headers, &route).await?;

    parts.extensions.insert(identity);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Authentication-only middleware
///
/// Attaches the caller's identity without requiring an active company.
pub async fn require_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = req.into_parts();

    let snapshot = authenticate(&auth.tokens, auth.identities.as_ref(), &parts.headers).await?;

    parts
        .extensions
        .insert(AuthenticatedIdentity::unscoped(&snapshot));
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Role gate middleware for one route
///
/// Must sit inside [`tenancy_guard`] so the identity is already attached.
///
/// ```no_run
/// use axum::{handler::Handler, middleware, routing::delete, Router};
/// use companyhub_shared::auth::middleware::require_roles;
/// use companyhub_shared::auth::roles::OWNER_ONLY;
///
/// async fn remove() -> &'static str {
///     "deleted"
/// }
///
/// let app: Router = Router::new().route(
///     "/companies/:id",
///     delete(remove.layer(middleware::from_fn(require_roles(OWNER_ONLY)))),
/// );
/// ```
pub fn require_roles(
    roles: &'static [MembershipRole],
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>> + Clone
{
    move |req, next| Box::pin(role_gate(roles, req, next))
}

async fn role_gate(
    roles: &'static [MembershipRole],
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = req
        .extensions()
        .get::<AuthenticatedIdentity>()
        .ok_or(AuthError::Unauthenticated)?;

    allow(identity, roles)?;

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{IdentitySnapshot, MemoryIdentityStore};
    use crate::models::membership::Membership;
    use crate::models::user::User;
    use axum::{
        body::Body,
        handler::Handler,
        http::{header, Method},
        middleware,
        routing::{get, post},
        Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";
    const ADMIN_ROLES: &[MembershipRole] = &[MembershipRole::Owner, MembershipRole::Admin];

    async fn role_of(identity: AuthenticatedIdentity) -> String {
        identity
            .role
            .map(|r| r.to_string())
            .unwrap_or_else(|| "NONE".to_string())
    }

    async fn setup(
        active: bool,
        role: Option<MembershipRole>,
    ) -> (Router, String) {
        let store = Arc::new(MemoryIdentityStore::new());
        let tokens = TokenService::new(SECRET, Duration::days(1));

        let company_id = Uuid::new_v4();
        let user = User {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            password_hash: String::new(),
            name: None,
            active_company_id: active.then_some(company_id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let memberships = role
            .map(|role| {
                vec![Membership {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    company_id,
                    role,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }]
            })
            .unwrap_or_default();

        let token = tokens
            .sign(&tokens.claims_for(user.id, &user.email, user.active_company_id))
            .unwrap();
        store.insert(IdentitySnapshot { user, memberships }).await;

        let auth = AuthState::new(tokens, store);
        let router = Router::new()
            .route("/companies", post(role_of).get(role_of))
            .route(
                "/settings",
                post(role_of.layer(middleware::from_fn(require_roles(ADMIN_ROLES)))),
            )
            .route_layer(middleware::from_fn_with_state(auth, tenancy_guard));

        (router, token)
    }

    fn request(method: Method, uri: &str, token: Option<&str>) -> Request {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("access_token={}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (app, _) = setup(true, Some(MembershipRole::Member)).await;

        let response = app.oneshot(request(Method::GET, "/companies", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_no_active_company_rejected_except_create() {
        let (app, token) = setup(false, None).await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/companies", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(Method::POST, "/companies", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_gate() {
        let (app, token) = setup(true, Some(MembershipRole::Admin)).await;
        let response = app
            .oneshot(request(Method::POST, "/settings", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (app, token) = setup(true, Some(MembershipRole::Member)).await;
        let response = app
            .oneshot(request(Method::POST, "/settings", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_extractor_without_guard_is_unauthorized() {
        let app: Router = Router::new().route("/whoami", get(role_of));

        let response = app.oneshot(request(Method::GET, "/whoami", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            AuthError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::NoActiveCompany.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AuthError::NotAMember.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InsufficientRole.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
