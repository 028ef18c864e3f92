//! Common test utilities for API integration tests
//!
//! Tests drive the full router (middleware included) through
//! `tower::ServiceExt::oneshot` against the PostgreSQL named by
//! `DATABASE_URL`. When it is unset, `TestContext::try_new` returns `None`
//! and the test returns early.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bitsa_api::app::{build_app, AppState};
use bitsa_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MediaConfig};
use bitsa_shared::auth::jwt::TokenPair;
use bitsa_shared::auth::password::hash_password;
use bitsa_shared::db::migrations::{ensure_database_exists, run_migrations};
use bitsa_shared::db::pool::{create_pool, DatabaseConfig as PoolConfig};
use bitsa_shared::models::user::{CreateUser, User};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "s3cret-pass";

/// Test context containing the pool and a ready router
pub struct TestContext {
    pub db: PgPool,
    pub app: NormalizePath<Router>,
    pub config: Config,
}

/// An account plus a valid access token for it
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl TestContext {
    /// Builds a context, or `None` when `DATABASE_URL` is not set
    pub async fn try_new() -> Option<Self> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("DATABASE_URL not set; skipping API integration test");
                return None;
            }
        };

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: url.clone(),
                max_connections: 20,
            },
            jwt: JwtConfig {
                secret: "integration-test-secret-with-enough-length".to_string(),
                access_ttl_minutes: 60,
                refresh_ttl_days: 7,
            },
            media: MediaConfig {
                base_url: Some("https://media.bitsa.test".to_string()),
            },
        };

        ensure_database_exists(&url)
            .await
            .expect("Failed to create database");

        let db = create_pool(PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::new(url)
        })
        .await
        .expect("Failed to create pool");

        run_migrations(&db).await.expect("Failed to run migrations");

        let app = build_app(AppState::new(db.clone(), config.clone()));

        Some(Self { db, app, config })
    }

    /// Inserts an account directly and issues it a token
    pub async fn create_user(&self, is_staff: bool) -> TestUser {
        let email = unique_email();

        let user = User::create(
            &self.db,
            CreateUser {
                username: email.clone(),
                email,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: hash_password(TEST_PASSWORD).expect("hash"),
                is_staff,
            },
        )
        .await
        .expect("Failed to create user");

        let tokens = TokenPair::issue(user.id, &self.config.jwt.secret, self.config.jwt.ttl())
            .expect("Failed to issue tokens");

        TestUser {
            user,
            token: tokens.access,
        }
    }

    /// Sends one request and returns the status and JSON body
    ///
    /// Empty bodies (e.g. 204) come back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!(
                    "Non-JSON response ({}): {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, token, Some(body)).await
    }
}

pub fn unique_email() -> String {
    format!("member-{}@example.com", Uuid::new_v4().simple())
}
