//! User account endpoints
//!
//! - `POST /api/users` - Create a user (public)
//! - `GET /api/users` - List users
//! - `GET /api/users/:id` - Get a user with their memberships
//! - `PATCH /api/users/:id` - Update yourself
//! - `DELETE /api/users/:id` - Delete yourself
//!
//! All but `POST` require a session; none require an active company.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Pagination,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use companyhub_shared::{
    auth::{guard::AuthenticatedIdentity, password},
    models::{
        company::Company,
        membership::Membership,
        user::{CreateUser, UpdateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,

    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    pub active_company_id: Option<Uuid>,
}

/// User with the companies they belong to
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub memberships: Vec<Membership>,
}

fn ensure_self(identity: &AuthenticatedIdentity, id: Uuid) -> ApiResult<()> {
    if identity.user_id == id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You can only modify your own account".to_string(),
        ))
    }
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
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

    info!(user_id = %user.id, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// List users, newest first
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<User>>> {
    let users = User::list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(users))
}

/// Get a user with their memberships
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDetail>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    let memberships = Membership::list_by_user(&state.db, id).await?;

    Ok(Json(UserDetail { user, memberships }))
}

/// Update your own account
///
/// A new password is re-hashed. A new active company must exist (404) and the
/// user must be a member of it (409).
pub async fn update_user(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    ensure_self(&identity, id)?;
    req.validate()?;

    if let Some(company_id) = req.active_company_id {
        Company::find_by_id(&state.db, company_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Company {} not found", company_id)))?;

        Membership::find_by_user_and_company(&state.db, id, company_id)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("User is not a member of the specified company".to_string())
            })?;
    }

    let password_hash = req
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            email: req.email,
            password_hash,
            name: req.name,
            active_company_id: req.active_company_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    info!(user_id = %user.id, "User updated");

    Ok(Json(user))
}

/// Delete your own account
pub async fn delete_user(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_self(&identity, id)?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("User {} not found", id)));
    }

    info!(user_id = %id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user_id: Uuid) -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            user_id,
            email: "ana@example.com".to_string(),
            active_company_id: None,
            role: None,
        }
    }

    #[test]
    fn test_ensure_self() {
        let id = Uuid::new_v4();
        assert!(ensure_self(&identity(id), id).is_ok());
        assert!(matches!(
            ensure_self(&identity(id), Uuid::new_v4()),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_update_request_camel_case() {
        let company_id = Uuid::new_v4();
        let req: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "activeCompanyId": company_id,
            "name": "Ana"
        }))
        .unwrap();

        assert_eq!(req.active_company_id, Some(company_id));
        assert!(req.password.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_request_short_password_rejected() {
        let req = UpdateUserRequest {
            password: Some("123".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
