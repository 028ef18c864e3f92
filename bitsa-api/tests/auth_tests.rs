//! Integration tests for registration, login, refresh and user admin
//!
//! Require PostgreSQL at `DATABASE_URL`; skipped when it is unset.

mod common;

use axum::http::{Method, StatusCode};
use common::{unique_email, TestContext, TEST_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_register_then_login_with_email() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let email = unique_email();

    let (status, body) = ctx
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Amina",
                "last_name": "Otieno",
                "email": email,
                "password": "s3cret!",
                "password_confirm": "s3cret!"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], email);
    assert_eq!(body["user"]["username"], email);
    assert_eq!(body["user"]["is_staff"], false);
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());

    // Email lookup ignores case; the /api mount behaves the same
    let (status, body) = ctx
        .post(
            "/api/auth/login/",
            None,
            json!({ "username": email.to_uppercase(), "password": "s3cret!" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["email"], email);
    assert!(body["access"].is_string());
}

#[tokio::test]
async fn test_register_rejects_duplicate_email_and_mismatch() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let existing = ctx.create_user(false).await;

    let (status, body) = ctx
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Dup",
                "email": existing.user.email.to_uppercase(),
                "password": "s3cret!",
                "password_confirm": "s3cret!"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "email");
    assert_eq!(body["details"][0]["message"], "Email already exists");

    let (status, body) = ctx
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Mismatch",
                "email": unique_email(),
                "password": "s3cret!",
                "password_confirm": "different"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password_confirm");

    let email = unique_email();
    let (status, body) = ctx
        .post(
            "/auth/register",
            None,
            json!({
                "first_name": "Padded",
                "email": format!("  {email} "),
                "password": "s3cret!",
                "password_confirm": "s3cret!"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], email);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let member = ctx.create_user(false).await;

    let (wrong_status, wrong_body) = ctx
        .post(
            "/auth/login",
            None,
            json!({ "email": member.user.email, "password": "not-the-password" }),
        )
        .await;
    let (unknown_status, unknown_body) = ctx
        .post(
            "/auth/login",
            None,
            json!({ "identifier": unique_email(), "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["message"], "Invalid credentials");
    assert_eq!(wrong_body, unknown_body);

    let (status, body) = ctx.post("/auth/login", None, json!({ "username": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let member = ctx.create_user(false).await;

    let (_, login) = ctx
        .post(
            "/auth/login",
            None,
            json!({ "username": member.user.username, "password": TEST_PASSWORD }),
        )
        .await;

    let refresh = login["refresh"].as_str().unwrap().to_string();
    let (status, body) = ctx.post("/auth/refresh", None, json!({ "refresh": refresh })).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let access = body["access"].as_str().unwrap().to_string();
    let (status, _) = ctx
        .post(
            "/blogs",
            Some(&access),
            json!({ "title": "Via refreshed token", "content": "Body" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // An access token is not a refresh token
    let (status, _) = ctx.post("/auth/refresh", None, json!({ "refresh": access })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_admin_is_staff_only() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let staff = ctx.create_user(true).await;
    let member = ctx.create_user(false).await;

    let (status, _) = ctx.get("/auth/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx.get("/auth/users", Some(&member.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = ctx.get("/auth/users/", Some(&staff.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().iter().any(|u| u["id"] == member.id()));

    let email = unique_email();
    let (status, body) = ctx
        .post(
            "/auth/users/add",
            Some(&staff.token),
            json!({
                "first_name": "Provisioned",
                "email": email,
                "password": "s3cret!",
                "is_staff": true
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["is_staff"], true);

    let (status, _) = ctx
        .post(
            "/auth/users/add",
            Some(&member.token),
            json!({ "first_name": "X", "email": unique_email(), "password": "s3cret!" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_toggle_block_locks_out_user() {
    let Some(ctx) = TestContext::try_new().await else { return };
    let staff = ctx.create_user(true).await;
    let member = ctx.create_user(false).await;

    let uri = format!("/auth/users/{}/toggle-block", member.id());
    let (status, body) = ctx.send(Method::PATCH, &uri, Some(&staff.token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["is_active"], false);

    // Existing tokens stop working immediately
    let (status, _) = ctx.get("/blogs", Some(&member.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .post(
            "/auth/login",
            None,
            json!({ "username": member.user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx.send(Method::PATCH, &uri, Some(&staff.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["is_active"], true);

    let (status, _) = ctx
        .send(Method::PATCH, "/auth/users/999999999/toggle-block", Some(&staff.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_malformed_token() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let (status, body) = ctx.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");

    let (status, body) = ctx.get("/blogs", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}
