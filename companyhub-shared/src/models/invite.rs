//! Invite model and database operations
//!
//! An invite is a single-purpose bearer token granting MEMBER access to one
//! company. Tokens are 64 hex characters (32 random bytes). Expiry is checked
//! lazily whenever an invite is looked up by token; expired rows are never
//! swept.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE invites (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(255) NOT NULL,
//!     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
//!     token VARCHAR(64) NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT invites_token_key UNIQUE (token)
//! );
//! ```

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::company::Company;
use super::membership::{CreateMembership, Membership, MembershipRole};
use super::user::{normalize_email, User};

/// Random bytes per invite token
pub const INVITE_TOKEN_BYTES: usize = 32;

const INVITE_COLUMNS: &str = "id, email, company_id, token, expires_at, created_at";

/// Invite errors
#[derive(Debug, Error)]
pub enum InviteError {
    /// No invite carries this token
    #[error("Invite not found")]
    NotFound,

    /// The invite exists but its expiry has passed
    #[error("Invite has expired")]
    Expired,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pending invitation to join a company
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,

    /// Address the invite was sent to (normalized)
    pub email: String,

    /// Company the invite grants access to
    pub company_id: Uuid,

    /// Bearer token; whoever holds it may accept the invite
    pub token: String,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating an invite
#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub email: String,
    pub company_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Generates a fresh invite token: 32 random bytes, hex encoded
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Invite {
    /// True if the invite can no longer be accepted at `now`
    ///
    /// An invite expiring exactly at `now` is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Fails with `Expired` if the invite is past its expiry at `now`
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), InviteError> {
        if self.is_expired_at(now) {
            Err(InviteError::Expired)
        } else {
            Ok(())
        }
    }

    /// Creates an invite with a freshly generated token
    pub async fn create(pool: &PgPool, data: CreateInvite) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO invites (email, company_id, token, expires_at) VALUES ($1, $2, $3, $4) RETURNING {}",
            INVITE_COLUMNS
        );

        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(normalize_email(&data.email))
            .bind(data.company_id)
            .bind(generate_invite_token())
            .bind(data.expires_at)
            .fetch_one(pool)
            .await?;

        info!(
            invite_id = %invite.id,
            company_id = %invite.company_id,
            expires_at = %invite.expires_at,
            "Invite created"
        );

        Ok(invite)
    }

    /// Lists a company's invites, newest first (expired ones included)
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM invites WHERE company_id = $1 ORDER BY created_at DESC",
            INVITE_COLUMNS
        );

        sqlx::query_as::<_, Invite>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Finds an invite by ID, scoped to a company
    pub async fn find_in_company(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM invites WHERE id = $1 AND company_id = $2",
            INVITE_COLUMNS
        );

        sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    async fn fetch_by_token<'e, E>(executor: E, token: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM invites WHERE token = $1", INVITE_COLUMNS);

        sqlx::query_as::<_, Invite>(&query)
            .bind(token)
            .fetch_optional(executor)
            .await
    }

    /// Looks an invite up by token
    ///
    /// # Errors
    ///
    /// - `NotFound` if no invite carries the token
    /// - `Expired` if it exists but has expired at `now`
    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, InviteError> {
        let invite = Self::fetch_by_token(pool, token)
            .await?
            .ok_or(InviteError::NotFound)?;

        invite.check_usable(now)?;
        Ok(invite)
    }

    /// Accepts an invite on behalf of `user_id`
    ///
    /// In one transaction: creates a MEMBER membership unless the user already
    /// belongs to the company, then sets the user's active company if they have
    /// none. Accepting the same invite again returns the existing membership
    /// without creating a second one. The invite row is left in place.
    pub async fn accept(
        pool: &PgPool,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Membership, Company), InviteError> {
        let mut tx = pool.begin().await?;

        let invite = Self::fetch_by_token(&mut *tx, token)
            .await?
            .ok_or(InviteError::NotFound)?;
        invite.check_usable(now)?;

        let (membership, created) = Membership::create_if_absent(
            &mut *tx,
            CreateMembership {
                user_id,
                company_id: invite.company_id,
                role: MembershipRole::Member,
            },
        )
        .await?;

        let activated =
            User::set_active_company_if_absent(&mut *tx, user_id, invite.company_id).await?;

        let company = Company::find_by_id(&mut *tx, invite.company_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        tx.commit().await?;

        info!(
            invite_id = %invite.id,
            company_id = %company.id,
            user_id = %user_id,
            membership_created = created,
            activated,
            "Invite accepted"
        );

        Ok((membership, company))
    }

    /// Deletes an invite, scoped to a company
    ///
    /// Returns false if no such invite exists in that company.
    pub async fn delete(pool: &PgPool, id: Uuid, company_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM invites WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
