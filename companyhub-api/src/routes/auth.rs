//! Authentication endpoints
//!
//! Sessions are carried by the `access_token` cookie (HttpOnly, SameSite=Lax).
//! The same token is accepted as `Authorization: Bearer` by the guards.
//!
//! # Endpoints
//!
//! - `POST /api/auth/signup` - Create an account and start a session
//! - `POST /api/auth/login` - Start a session
//! - `POST /api/auth/logout` - Clear the session cookie
//! - `GET /api/auth/me` - Current user and memberships

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use companyhub_shared::{
    auth::{extract::ACCESS_TOKEN_COOKIE, guard::AuthenticatedIdentity, password},
    models::{
        membership::Membership,
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Current session
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub memberships: Vec<Membership>,
}

/// Builds the `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        ACCESS_TOKEN_COOKIE,
        token,
        max_age_seconds.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Issues a token for `user` and attaches it as the session cookie
fn start_session(state: &AppState, status: StatusCode, user: User) -> ApiResult<Response> {
    let tokens = state.tokens();
    let claims = tokens.claims_for(user.id, &user.email, user.active_company_id);
    let token = tokens.sign(&claims)?;

    let cookie = session_cookie(
        &token,
        tokens.ttl().num_seconds(),
        state.config.cookie.secure,
    );

    Ok((status, [(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

/// Create an account
///
/// ```text
/// POST /api/auth/signup
/// { "email": "ana@example.com", "password": "secret1", "name": "Ana" }
/// ```
///
/// Responds 201 with the user and sets the session cookie.
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
        },
    )
    .await?;

    info!(user_id = %user.id, "User signed up");

    start_session(&state, StatusCode::CREATED, user)
}

/// Start a session
///
/// Unknown email and wrong password get the same 401 so accounts cannot be
/// enumerated.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email).await?;

    let verified = match user {
        Some(user) if password::verify_password(&req.password, &user.password_hash) => Some(user),
        Some(_) => None,
        None => {
            password::verify_dummy_password(&req.password);
            None
        }
    };

    let Some(user) = verified else {
        debug!("Login rejected");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    info!(user_id = %user.id, "User logged in");

    start_session(&state, StatusCode::OK, user)
}

/// Clear the session cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            session_cookie("", 0, state.config.cookie.secure),
        )],
    )
}

/// Current user and their memberships
pub async fn me(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, identity.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let memberships = Membership::list_by_user(&state.db, user.id).await?;

    Ok(Json(MeResponse { user, memberships }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", 86400, false);
        assert_eq!(
            cookie,
            "access_token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=86400"
        );
    }

    #[test]
    fn test_session_cookie_secure() {
        assert!(session_cookie("abc", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn test_cleared_cookie() {
        let cookie = session_cookie("", 0, false);
        assert!(cookie.starts_with("access_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_signup_validation() {
        let req = SignupRequest {
            email: "nope".to_string(),
            password: "123".to_string(),
            name: Some("A".to_string()),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("name"));
    }
}
