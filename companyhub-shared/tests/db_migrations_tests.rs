//! Migration runner against a real database

mod common;

use companyhub_shared::db::migrations::{migration_status, run_migrations};
use companyhub_shared::db::pool::{close_pool, get_pool_stats, health_check};

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_run_migrations() {
    let pool = common::setup_pool().await;

    let status = migration_status(&pool).await.expect("Failed to get status");
    assert!(status.applied_migrations > 0, "No migrations were applied");
    assert!(status.latest_version.is_some());

    close_pool(pool).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_migrations_are_idempotent() {
    let pool = common::setup_pool().await;

    let before = migration_status(&pool).await.expect("Failed to get status");
    run_migrations(&pool).await.expect("Second migration run failed");
    let after = migration_status(&pool).await.expect("Failed to get status");

    assert_eq!(before, after);
    close_pool(pool).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_pool_health() {
    let pool = common::setup_pool().await;

    health_check(&pool).await.expect("Health check failed");
    assert!(get_pool_stats(&pool).total_connections > 0);

    close_pool(pool).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_schema_tables_exist() {
    let pool = common::setup_pool().await;

    for table in ["users", "companies", "memberships", "invites"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("Failed to query schema");

        assert!(exists, "table {} should exist", table);
    }

    close_pool(pool).await;
}
