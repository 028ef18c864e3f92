//! Integration tests for embedded migrations
//!
//! Require PostgreSQL at `DATABASE_URL`; skipped when it is unset.

mod common;

use bitsa_shared::db::migrations::{get_migration_status, known_migrations, run_migrations};

#[tokio::test]
async fn test_migrations_bring_schema_up_to_date() {
    let Some(pool) = common::migrated_pool().await else { return };

    let status = get_migration_status(&pool).await.expect("Failed to read status");

    assert_eq!(status.known_migrations, known_migrations());
    assert!(status.applied_migrations >= status.known_migrations);
    assert!(status.is_up_to_date);
    assert!(status.latest_version.is_some());
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let Some(pool) = common::migrated_pool().await else { return };

    let before = get_migration_status(&pool).await.expect("Failed to read status");
    run_migrations(&pool).await.expect("Second run failed");
    let after = get_migration_status(&pool).await.expect("Failed to read status");

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_email_uniqueness_ignores_case() {
    let Some(pool) = common::migrated_pool().await else { return };

    let user = common::create_user(&pool, false).await;

    let err = sqlx::query(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, 'x')",
    )
    .bind(common::unique("dup"))
    .bind(user.email.to_uppercase())
    .execute(&pool)
    .await
    .expect_err("Duplicate email in another case must be rejected");

    let constraint = err
        .as_database_error()
        .and_then(|e| e.constraint())
        .map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("users_email_lower_key"));
}

#[tokio::test]
async fn test_published_posts_require_timestamp() {
    let Some(pool) = common::migrated_pool().await else { return };

    let user = common::create_user(&pool, false).await;

    let result = sqlx::query(
        "INSERT INTO blog_posts (title, content, author_id, is_published) VALUES ('t', 'c', $1, TRUE)",
    )
    .bind(user.id)
    .execute(&pool)
    .await;

    assert!(result.is_err(), "A published post without published_at violates the check");
}
