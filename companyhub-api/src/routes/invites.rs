//! Invite endpoints
//!
//! - `POST /api/invites` - Invite an email into the active company (OWNER, ADMIN)
//! - `GET /api/invites` - Invites of the active company
//! - `GET /api/invites/:id` - One invite of the active company
//! - `GET /api/invites/token/:token` - Look an invite up by token
//! - `POST /api/invites/accept` - Join the invite's company
//! - `DELETE /api/invites/:id` - Revoke an invite (OWNER, ADMIN)
//!
//! Accepting is allowed without an active company. Invites expire lazily: an
//! expired invite stays listed but cannot be looked up or accepted (400).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use companyhub_shared::{
    auth::guard::AuthenticatedIdentity,
    models::{
        company::Company,
        invite::{CreateInvite, Invite},
        membership::Membership,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub company_id: Uuid,

    /// Defaults to now + `INVITE_TTL_DAYS`
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptInviteResponse {
    pub membership: Membership,
    pub company: Company,
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Invite {} not found", id))
}

/// Resolves the requested expiry against `now`
fn resolve_expiry(
    requested: Option<DateTime<Utc>>,
    default_ttl: chrono::Duration,
    now: DateTime<Utc>,
) -> ApiResult<DateTime<Utc>> {
    let expires_at = match requested {
        Some(expires_at) => expires_at,
        None => now.checked_add_signed(default_ttl).ok_or_else(|| {
            ApiError::InternalError("Invite lifetime is out of range".to_string())
        })?,
    };

    if expires_at <= now {
        return Err(ApiError::BadRequest(
            "Expiration date must be in the future".to_string(),
        ));
    }

    Ok(expires_at)
}

/// Invite an email address into the active company
///
/// # Errors
///
/// - `400 Bad Request`: `expiresAt` is not in the future
/// - `403 Forbidden`: `companyId` is not the active company
pub async fn create_invite(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<Invite>)> {
    req.validate()?;

    if req.company_id != identity.company_id()? {
        return Err(ApiError::Forbidden(
            "Invites can only be created for the active company".to_string(),
        ));
    }

    let expires_at = resolve_expiry(req.expires_at, state.config.invites.ttl, Utc::now())?;

    let invite = Invite::create(
        &state.db,
        CreateInvite {
            email: req.email,
            company_id: req.company_id,
            expires_at,
        },
    )
    .await?;

    // No mail transport yet; delivery is logged
    info!(
        invite_id = %invite.id,
        recipient = %invite.email,
        invited_by = %identity.user_id,
        "Invite email sent"
    );

    Ok((StatusCode::CREATED, Json(invite)))
}

pub async fn list_invites(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
) -> ApiResult<Json<Vec<Invite>>> {
    let invites = Invite::list_by_company(&state.db, identity.company_id()?).await?;
    Ok(Json(invites))
}

pub async fn get_invite(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invite>> {
    let invite = Invite::find_in_company(&state.db, id, identity.company_id()?)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(invite))
}

/// Look an invite up by token: 404 if unknown, 400 if expired
pub async fn get_invite_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<Invite>> {
    let invite = Invite::find_by_token(&state.db, &token, Utc::now()).await?;
    Ok(Json(invite))
}

/// Accept an invite
///
/// Idempotent: accepting again returns the existing membership. The caller's
/// active company is set to the invite's company if they have none.
pub async fn accept_invite(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(req): Json<AcceptInviteRequest>,
) -> ApiResult<Json<AcceptInviteResponse>> {
    req.validate()?;

    let (membership, company) =
        Invite::accept(&state.db, &req.token, identity.user_id, Utc::now()).await?;

    Ok(Json(AcceptInviteResponse {
        membership,
        company,
    }))
}

pub async fn delete_invite(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Invite::delete(&state.db, id, identity.company_id()?).await? {
        return Err(not_found(id));
    }

    info!(invite_id = %id, "Invite deleted");

    Ok(StatusCode::NO_CONTENT)
}
