/// Staff user administration
///
/// # Endpoints
///
/// - `GET /auth/users` - List all users, newest first
/// - `POST /auth/users/add` - Provision a user
/// - `PATCH /auth/users/:id/toggle-block` - Block or unblock a user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, ValidatedJson},
    routes::{auth::UserResponse, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bitsa_shared::{
    auth::{authorization::require_staff, password},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const STAFF_ONLY: &str = "Only staff can manage users";

/// Provision request
#[derive(Debug, Deserialize, Validate)]
pub struct AddUserRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 150, message = "First name is required"))]
    pub first_name: String,

    #[serde(default, deserialize_with = "super::trimmed")]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    #[serde(deserialize_with = "super::trimmed")]
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    pub password: String,

    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleBlockResponse {
    pub message: String,
    pub user: UserResponse,
}

/// List all users (staff only)
///
/// # Errors
///
/// - `401 Unauthorized`: anonymous
/// - `403 Forbidden`: not staff
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    require_staff(Some(&user.actor()), STAFF_ONLY)?;

    let users = User::list(&state.db, page.limit(), page.offset()).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Provision a user (staff only)
///
/// Like registration, the username is the email address; unlike it, the
/// caller may grant staff.
pub async fn add_user(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<AddUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let actor = require_staff(Some(&user.actor()), STAFF_ONLY)?.to_owned();

    password::validate_password(&req.password)
        .map_err(|message| ApiError::field("password", message))?;

    let email = req.email;
    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::field("email", "Email already exists"));
    }

    let password_hash = password::hash_password(&req.password)?;

    let created = User::create(
        &state.db,
        CreateUser {
            username: email.clone(),
            email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            is_staff: req.is_staff,
        },
    )
    .await?;

    tracing::info!(
        user_id = created.id,
        by = actor.user_id,
        is_staff = created.is_staff,
        "User provisioned"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Flip a user's active flag (staff only)
///
/// # Errors
///
/// - `404 Not Found`: unknown user id
pub async fn toggle_block(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ToggleBlockResponse>> {
    let actor = require_staff(Some(&user.actor()), STAFF_ONLY)?.to_owned();

    let updated = User::toggle_active(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let verb = if updated.is_active { "unblocked" } else { "blocked" };
    tracing::info!(user_id = updated.id, by = actor.user_id, "User {}", verb);

    Ok(Json(ToggleBlockResponse {
        message: format!("User {} successfully", verb),
        user: updated.into(),
    }))
}
