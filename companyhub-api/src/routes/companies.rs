//! Company endpoints
//!
//! All routes sit behind the tenancy guard. Creating a company is allowed
//! without an active company, since that is how a new user gets one.
//!
//! - `POST /api/companies` - Create a company; the caller becomes OWNER
//! - `GET /api/companies` - Companies the caller belongs to, paginated
//! - `GET /api/companies/:id` - One company, if the caller is a member
//! - `PATCH /api/companies/:id` - Update the active company (OWNER, ADMIN)
//! - `DELETE /api/companies/:id` - Delete the active company (OWNER)
//! - `POST /api/companies/:id/select` - Switch the active company

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Paginated, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use companyhub_shared::{
    auth::guard::AuthenticatedIdentity,
    models::{
        company::{Company, CreateCompany, UpdateCompany},
        membership::Membership,
        user::{UpdateUser, User},
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(url(message = "Logo must be a URL"))]
    pub logo: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(url(message = "Logo must be a URL"))]
    pub logo: Option<String>,
}

/// Role-gated company routes act on the company the role was read from
fn ensure_active(identity: &AuthenticatedIdentity, id: Uuid) -> ApiResult<()> {
    if identity.company_id()? == id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Company is not the active company of this session".to_string(),
        ))
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Company {} not found", id))
}

/// Create a company
///
/// The company, the caller's OWNER membership and (if the caller has none)
/// their active company are written in one transaction.
pub async fn create_company(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    req.validate()?;

    let company = Company::create_with_owner(
        &state.db,
        CreateCompany {
            name: req.name,
            logo: req.logo,
        },
        identity.user_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

/// Companies the caller belongs to
pub async fn list_companies(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Paginated<Company>>> {
    let companies = Company::list_for_user(
        &state.db,
        identity.user_id,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let total = Company::count_for_user(&state.db, identity.user_id).await?;

    Ok(Json(pagination.paginate(companies, total)))
}

/// One company; 404 unless the caller is a member
pub async fn get_company(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Company>> {
    let company = Company::find_for_user(&state.db, id, identity.user_id)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(company))
}

/// Update the active company
pub async fn update_company(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<Company>> {
    ensure_active(&identity, id)?;
    req.validate()?;

    let company = Company::update(
        &state.db,
        id,
        UpdateCompany {
            name: req.name,
            logo: req.logo,
        },
    )
    .await?
    .ok_or_else(|| not_found(id))?;

    info!(company_id = %id, user_id = %identity.user_id, "Company updated");

    Ok(Json(company))
}

/// Delete the active company
///
/// Members whose active company it was are moved to another of their
/// companies, or left without one.
pub async fn delete_company(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_active(&identity, id)?;

    if !Company::delete(&state.db, id).await? {
        return Err(not_found(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Switch the caller's active company
///
/// Later requests are scoped to the new company. The session token does not
/// need to be reissued; the guard reads the active company from the database.
pub async fn select_company(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    Membership::find_by_user_and_company(&state.db, identity.user_id, id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("User is not a member of this company".to_string()))?;

    let user = User::update(
        &state.db,
        identity.user_id,
        UpdateUser {
            active_company_id: Some(id),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    info!(user_id = %user.id, company_id = %id, "Active company selected");

    Ok(Json(user))
}
