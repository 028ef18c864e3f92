//! Shared helpers for database-backed tests
//!
//! Tests run against the PostgreSQL named by `DATABASE_URL`. When it is not
//! set they return early so `cargo test` still passes on machines without a
//! database.

#![allow(dead_code)]

use bitsa_shared::db::migrations::{ensure_database_exists, run_migrations};
use bitsa_shared::db::pool::{create_pool, DatabaseConfig};
use bitsa_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use std::sync::atomic::{AtomicU64, Ordering};

pub fn database_url() -> Option<String> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => Some(url),
        _ => {
            eprintln!("DATABASE_URL not set; skipping database test");
            None
        }
    }
}

/// Connects and migrates, or returns None when no database is configured
pub async fn migrated_pool() -> Option<PgPool> {
    let url = database_url()?;

    ensure_database_exists(&url).await.expect("Failed to create database");

    let pool = create_pool(DatabaseConfig {
        max_connections: 20,
        ..DatabaseConfig::new(url)
    })
    .await
    .expect("Failed to create pool");

    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

/// A string unique across this test process and previous runs
pub fn unique(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{nanos}-{n}")
}

/// Inserts a user with a throwaway password hash
pub async fn create_user(pool: &PgPool, is_staff: bool) -> User {
    let email = format!("{}@example.com", unique("user"));

    User::create(
        pool,
        CreateUser {
            username: email.clone(),
            email,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            is_staff,
        },
    )
    .await
    .expect("Failed to create user")
}
