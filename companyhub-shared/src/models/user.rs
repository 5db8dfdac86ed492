//! User model and database operations
//!
//! Users authenticate with email + password and belong to any number of
//! companies through the Membership model. The `active_company_id` column is
//! the company the user's session is currently scoped to.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(255) NOT NULL UNIQUE,
//!     password_hash VARCHAR(255) NOT NULL,
//!     name VARCHAR(255),
//!     active_company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Emails are normalized to lowercase before they reach the database, so the
//! unique constraint is effectively case-insensitive.
//!
//! # Example
//!
//! ```no_run
//! use companyhub_shared::models::user::{User, CreateUser};
//! use companyhub_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, CreateUser {
//!     email: "ana@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//!     name: Some("Ana".to_string()),
//! }).await?;
//!
//! let found = User::find_by_email(&pool, "ANA@example.com").await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, password_hash, name, active_company_id, created_at, updated_at";

/// User account
///
/// `password_hash` is never serialized; responses built from a `User` cannot
/// leak it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Lowercased email address, unique across all users
    pub email: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Company the session is currently scoped to
    pub active_company_id: Option<Uuid>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address (normalized on insert)
    pub email: String,

    /// Argon2id password hash, NOT the plaintext password
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,
}

/// Input for updating an existing user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New display name
    pub name: Option<String>,

    /// New active company (membership must be checked by the caller)
    pub active_company_id: Option<Uuid>,
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on duplicate email (`users_email_key`) or
    /// connection failure.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.name)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use companyhub_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_id(&pool, user_id).await? {
    ///     println!("Found user: {}", user.email);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Lists users, newest first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written; `updated_at` is always
    /// bumped.
    ///
    /// # Returns
    ///
    /// The updated user, or None if the user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if the new email is taken or the database fails
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.active_company_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", active_company_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(normalize_email(&email));
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(company_id) = data.active_company_id {
            q = q.bind(company_id);
        }

        q.fetch_optional(pool).await
    }

    /// Sets the active company only if the user has none yet
    ///
    /// Used by company creation and invite acceptance inside their
    /// transactions. Returns true if the column was written.
    pub async fn set_active_company_if_absent<'e, E>(
        executor: E,
        id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET active_company_id = $2, updated_at = NOW()
            WHERE id = $1 AND active_company_id IS NULL
            "#,
        )
        .bind(id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Re-points every user whose active company is `company_id`
    ///
    /// Each affected user is moved to their oldest remaining membership in
    /// another company, or to NULL if they have none. Must run before the
    /// company row is deleted.
    pub async fn reassign_active_company<'e, E>(
        executor: E,
        company_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users u
            SET active_company_id = (
                    SELECT m.company_id FROM memberships m
                    WHERE m.user_id = u.id AND m.company_id <> $1
                    ORDER BY m.created_at ASC
                    LIMIT 1
                ),
                updated_at = NOW()
            WHERE u.active_company_id = $1
            "#,
        )
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Re-points one user away from `company_id` if it is their active company
    ///
    /// Same rule as [`User::reassign_active_company`]; run after the user's
    /// membership in `company_id` is removed.
    pub async fn leave_active_company<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users u
            SET active_company_id = (
                    SELECT m.company_id FROM memberships m
                    WHERE m.user_id = u.id AND m.company_id <> $2
                    ORDER BY m.created_at ASC
                    LIMIT 1
                ),
                updated_at = NOW()
            WHERE u.id = $1 AND u.active_company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user by ID
    ///
    /// Memberships cascade. Returns false if the user didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
