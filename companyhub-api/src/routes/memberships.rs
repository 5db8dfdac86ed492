//! Membership endpoints, scoped to the caller's active company
//!
//! - `POST /api/memberships` - Add a user (OWNER, ADMIN)
//! - `GET /api/memberships` - List members
//! - `GET /api/memberships/:id` - Get one member
//! - `PATCH /api/memberships/:id` - Change a role (OWNER, ADMIN)
//! - `DELETE /api/memberships/:id` - Remove a member (OWNER, ADMIN)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use companyhub_shared::{
    auth::guard::AuthenticatedIdentity,
    models::{
        membership::{CreateMembership, Membership, MembershipRole},
        user::User,
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    pub role: MembershipRole,
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Membership {} not found", id))
}

/// Add a user to the active company
///
/// # Errors
///
/// - `403 Forbidden`: `companyId` is not the active company
/// - `404 Not Found`: The user doesn't exist
/// - `409 Conflict`: The user is already a member
pub async fn create_membership(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(req): Json<CreateMembership>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    if req.company_id != identity.company_id()? {
        return Err(ApiError::Forbidden(
            "Memberships can only be created in the active company".to_string(),
        ));
    }

    User::find_by_id(&state.db, req.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", req.user_id)))?;

    // The unique constraint turns a concurrent duplicate into 409 as well
    let membership = Membership::create(&state.db, req).await?;

    info!(
        membership_id = %membership.id,
        company_id = %membership.company_id,
        role = %membership.role,
        "Membership created"
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// Members of the active company
pub async fn list_memberships(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
) -> ApiResult<Json<Vec<Membership>>> {
    let memberships = Membership::list_by_company(&state.db, identity.company_id()?).await?;
    Ok(Json(memberships))
}

pub async fn get_membership(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Membership>> {
    let membership = Membership::find_in_company(&state.db, id, identity.company_id()?)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(membership))
}

pub async fn update_membership(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMembershipRequest>,
) -> ApiResult<Json<Membership>> {
    let membership = Membership::update_role(&state.db, id, identity.company_id()?, req.role)
        .await?
        .ok_or_else(|| not_found(id))?;

    info!(membership_id = %id, role = %membership.role, "Membership updated");

    Ok(Json(membership))
}

pub async fn delete_membership(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Membership::delete(&state.db, id, identity.company_id()?).await? {
        return Err(not_found(id));
    }

    info!(membership_id = %id, "Membership deleted");

    Ok(StatusCode::NO_CONTENT)
}
