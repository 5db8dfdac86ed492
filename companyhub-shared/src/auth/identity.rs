//! Identity resolution
//!
//! Loads the user named by a verified token together with all of their
//! memberships. Both reads come from one consistent view so the guard never
//! pairs a user row with memberships from a different moment.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::membership::Membership;
use crate::models::user::User;

/// Storage failure while loading an identity
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure to resolve a token subject into an identity
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The subject of a valid token no longer exists
    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A user and every membership they hold, read together
#[derive(Debug, Clone)]
pub struct IdentitySnapshot {
    pub user: User,
    pub memberships: Vec<Membership>,
}

impl IdentitySnapshot {
    /// The user's membership in `company_id`, if any
    pub fn membership_in(&self, company_id: Uuid) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|membership| membership.company_id == company_id)
    }
}

/// Source of identity snapshots
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Loads a user and their memberships, or None if the user doesn't exist
    async fn load_identity(&self, user_id: Uuid) -> Result<Option<IdentitySnapshot>, StoreError>;
}

/// Resolves a token subject into an identity snapshot
///
/// # Errors
///
/// - `UserNotFound` if the user has been deleted since the token was issued
/// - `Store` if the store could not be read
pub async fn resolve(
    store: &dyn IdentityStore,
    user_id: Uuid,
) -> Result<IdentitySnapshot, ResolveError> {
    store
        .load_identity(user_id)
        .await?
        .ok_or(ResolveError::UserNotFound)
}

/// PostgreSQL-backed identity store
///
/// Reads the user and memberships inside one `REPEATABLE READ, READ ONLY`
/// transaction.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn load_identity(&self, user_id: Uuid) -> Result<Option<IdentitySnapshot>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(user) = User::find_by_id(&mut *tx, user_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let memberships = Membership::list_by_user(&mut *tx, user_id).await?;
        tx.commit().await?;

        Ok(Some(IdentitySnapshot { user, memberships }))
    }
}

/// In-memory identity store
///
/// Backs router tests and local experiments that should not need a database.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    snapshots: RwLock<HashMap<Uuid, IdentitySnapshot>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the snapshot for `snapshot.user.id`
    pub async fn insert(&self, snapshot: IdentitySnapshot) {
        self.snapshots
            .write()
            .await
            .insert(snapshot.user.id, snapshot);
    }

    /// Removes a user, as if their account had been deleted
    pub async fn remove(&self, user_id: Uuid) {
        self.snapshots.write().await.remove(&user_id);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load_identity(&self, user_id: Uuid) -> Result<Option<IdentitySnapshot>, StoreError> {
        Ok(self.snapshots.read().await.get(&user_id).cloned())
    }
}
