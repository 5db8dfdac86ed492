//! Company model and database operations
//!
//! A company is the tenant: the scoping boundary for memberships, invites and
//! role checks. Every company has at least one OWNER membership from the
//! moment it becomes visible to other transactions.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE companies (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     logo VARCHAR(1024),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use companyhub_shared::models::company::{Company, CreateCompany};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
//! let company = Company::create_with_owner(&pool, CreateCompany {
//!     name: "Acme".to_string(),
//!     logo: None,
//! }, user_id).await?;
//!
//! let mine = Company::list_for_user(&pool, user_id, 10, 0).await?;
//! assert!(mine.iter().any(|c| c.id == company.id));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use super::membership::{CreateMembership, Membership, MembershipRole};
use super::user::User;

/// Company (tenant)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    /// Unique company ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Optional logo URL
    pub logo: Option<String>,

    /// When the company was created
    pub created_at: DateTime<Utc>,

    /// When the company was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a company
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub name: String,
    pub logo: Option<String>,
}

/// Input for updating a company
#[derive(Debug, Clone, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub logo: Option<String>,
}

impl Company {
    /// Creates a company and makes `owner_id` its OWNER
    ///
    /// Runs as one transaction:
    /// 1. Insert the company
    /// 2. Insert the OWNER membership
    /// 3. Set the creator's active company if they have none
    ///
    /// No other transaction can observe the company without its owner, or the
    /// creator pointing at a company they are not yet a member of.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; nothing is committed in that
    /// case.
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateCompany,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, logo)
            VALUES ($1, $2)
            RETURNING id, name, logo, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.logo)
        .fetch_one(&mut *tx)
        .await?;

        Membership::create(
            &mut *tx,
            CreateMembership {
                user_id: owner_id,
                company_id: company.id,
                role: MembershipRole::Owner,
            },
        )
        .await?;

        let activated = User::set_active_company_if_absent(&mut *tx, owner_id, company.id).await?;

        tx.commit().await?;

        info!(
            company_id = %company.id,
            user_id = %owner_id,
            activated,
            "Company created"
        );

        Ok(company)
    }

    /// Finds a company by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, logo, created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a company only if `user_id` is a member of it
    pub async fn find_for_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT c.id, c.name, c.logo, c.created_at, c.updated_at
            FROM companies c
            JOIN memberships m ON m.company_id = c.id
            WHERE c.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the companies a user belongs to, oldest membership first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT c.id, c.name, c.logo, c.created_at, c.updated_at
            FROM companies c
            JOIN memberships m ON m.company_id = c.id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts the companies a user belongs to
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    /// Updates a company
    ///
    /// Returns None if the company doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                logo = COALESCE($3, logo),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, logo, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.logo)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a company
    ///
    /// Users whose active company this was are re-pointed to another of their
    /// companies (or cleared) in the same transaction; memberships and invites
    /// cascade.
    ///
    /// Returns false if the company didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let reassigned = User::reassign_active_company(&mut *tx, id).await?;

        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(company_id = %id, reassigned_users = reassigned, "Company deleted");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_serializes_camel_case() {
        let company = Company {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            logo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&company).unwrap();
        assert_eq!(json["name"], "Acme");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_update_company_default() {
        let update = UpdateCompany::default();
        assert!(update.name.is_none());
        assert!(update.logo.is_none());
    }
}
