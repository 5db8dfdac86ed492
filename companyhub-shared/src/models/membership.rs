//! Membership model and database operations
//!
//! A membership is the (user, company, role) association that grants access
//! to a company. There is at most one membership per (user, company) pair.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE membership_role AS ENUM ('OWNER', 'ADMIN', 'MEMBER');
//!
//! CREATE TABLE memberships (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
//!     role membership_role NOT NULL DEFAULT 'MEMBER',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT memberships_user_company_key UNIQUE (user_id, company_id)
//! );
//! ```
//!
//! # Roles
//!
//! - **OWNER**: created the company; the only role that may delete it
//! - **ADMIN**: manages members, invites and company details
//! - **MEMBER**: read access to the company
//!
//! Roles are flat. Route declarations list every role they accept; OWNER does
//! not implicitly satisfy an ADMIN-only requirement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use super::user::User;

/// Roles a user can hold in a company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    /// Full control, including company deletion
    Owner,

    /// Manages members, invites and company details
    Admin,

    /// Regular member
    Member,
}

impl MembershipRole {
    /// Wire/database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "OWNER",
            MembershipRole::Admin => "ADMIN",
            MembershipRole::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    /// Membership ID
    pub id: Uuid,

    /// Member user
    pub user_id: Uuid,

    /// Company the membership grants access to
    pub company_id: Uuid,

    /// Role within the company
    pub role: MembershipRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// When the role was last changed
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMembership {
    pub user_id: Uuid,

    pub company_id: Uuid,

    /// Role to assign (defaults to MEMBER)
    #[serde(default = "default_role")]
    pub role: MembershipRole,
}

fn default_role() -> MembershipRole {
    MembershipRole::Member
}

const MEMBERSHIP_COLUMNS: &str = "id, user_id, company_id, role, created_at, updated_at";

impl Membership {
    /// Creates a new membership
    ///
    /// Accepts any executor so it can join the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The membership already exists (`memberships_user_company_key`)
    /// - User or company doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateMembership) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO memberships (user_id, company_id, role) VALUES ($1, $2, $3) RETURNING {}",
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(data.user_id)
            .bind(data.company_id)
            .bind(data.role)
            .fetch_one(executor)
            .await
    }

    /// Creates a membership unless the (user, company) pair already has one
    ///
    /// Returns the existing or newly created row, and whether it was created.
    /// Concurrent callers racing on the same pair both succeed and observe the
    /// same row.
    pub async fn create_if_absent(
        conn: &mut sqlx::PgConnection,
        data: CreateMembership,
    ) -> Result<(Self, bool), sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO memberships (user_id, company_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT memberships_user_company_key DO NOTHING
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );

        let inserted = sqlx::query_as::<_, Membership>(&query)
            .bind(data.user_id)
            .bind(data.company_id)
            .bind(data.role)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(membership) = inserted {
            return Ok((membership, true));
        }

        let existing = Self::find_by_user_and_company(&mut *conn, data.user_id, data.company_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok((existing, false))
    }

    /// Finds the membership of `user_id` in `company_id`
    pub async fn find_by_user_and_company<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM memberships WHERE user_id = $1 AND company_id = $2",
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(user_id)
            .bind(company_id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a membership by ID, scoped to a company
    pub async fn find_in_company(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM memberships WHERE id = $1 AND company_id = $2",
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all memberships of a user, oldest first
    pub async fn list_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM memberships WHERE user_id = $1 ORDER BY created_at ASC",
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(user_id)
            .fetch_all(executor)
            .await
    }

    /// Lists all members of a company, oldest first
    pub async fn list_by_company(
        pool: &PgPool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM memberships WHERE company_id = $1 ORDER BY created_at ASC",
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Changes the role of a membership within a company
    ///
    /// Returns None if no such membership exists in that company.
    pub async fn update_role(
        pool: &PgPool,
        id: Uuid,
        company_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE memberships
            SET role = $3, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );

        sqlx::query_as::<_, Membership>(&query)
            .bind(id)
            .bind(company_id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Removes a membership from a company
    ///
    /// If the company was the removed user's active company, the user is
    /// re-pointed to their oldest remaining membership (or NULL) in the same
    /// transaction.
    ///
    /// Returns false if no such membership exists in that company.
    pub async fn delete(pool: &PgPool, id: Uuid, company_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let removed: Option<Uuid> = sqlx::query_scalar(
            "DELETE FROM memberships WHERE id = $1 AND company_id = $2 RETURNING user_id",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = removed else {
            return Ok(false);
        };

        let repointed = User::leave_active_company(&mut *tx, user_id, company_id).await?;

        tx.commit().await?;

        if repointed {
            info!(%user_id, %company_id, "Active company re-pointed after membership removal");
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_as_str() {
        assert_eq!(MembershipRole::Owner.as_str(), "OWNER");
        assert_eq!(MembershipRole::Admin.as_str(), "ADMIN");
        assert_eq!(MembershipRole::Member.as_str(), "MEMBER");
        assert_eq!(MembershipRole::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_membership_role_serde() {
        let json = serde_json::to_string(&MembershipRole::Owner).unwrap();
        assert_eq!(json, "\"OWNER\"");

        let role: MembershipRole = serde_json::from_str("\"MEMBER\"").unwrap();
        assert_eq!(role, MembershipRole::Member);

        assert!(serde_json::from_str::<MembershipRole>("\"owner\"").is_err());
        assert!(serde_json::from_str::<MembershipRole>("\"VIEWER\"").is_err());
    }

    #[test]
    fn test_create_membership_default_role() {
        let data: CreateMembership = serde_json::from_value(serde_json::json!({
            "userId": Uuid::new_v4(),
            "companyId": Uuid::new_v4(),
        }))
        .unwrap();

        assert_eq!(data.role, MembershipRole::Member);
    }
}
