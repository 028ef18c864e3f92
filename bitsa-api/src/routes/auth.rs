/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register a member account and get tokens
/// - `POST /auth/login` - Login with email or username and get tokens
/// - `POST /auth/refresh` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{extract::State, http::StatusCode, Json};
use bitsa_shared::{
    auth::{identity, jwt, password},
    models::user::{CreateUser, User},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            is_staff: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "super::trimmed")]
    #[validate(length(min = 1, max = 150, message = "First name is required"))]
    pub first_name: String,

    #[serde(default, deserialize_with = "super::trimmed")]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    #[serde(deserialize_with = "super::trimmed")]
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,
}

/// Login request
///
/// The identifier may be sent as `username`, `identifier` or `email`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, alias = "identifier", alias = "email")]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Token refresh request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response of register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new member
///
/// The account's username is its email address. New accounts are never
/// staff.
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
///
/// {
///   "first_name": "Amina",
///   "last_name": "Otieno",
///   "email": "amina@example.com",
///   "password": "s3cret!",
///   "password_confirm": "s3cret!"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, passwords differ, or the email is
///   already registered
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = req.email;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::field("email", "Email already exists"));
    }

    let password_hash = password::hash_password(&req.password)?;

    // The unique index still decides races between concurrent registrations
    let user = User::create(
        &state.db,
        CreateUser {
            username: email.clone(),
            email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            is_staff: false,
        },
    )
    .await?;

    let tokens = jwt::TokenPair::issue(user.id, state.jwt_secret(), state.token_ttl())?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            access: tokens.access,
            refresh: tokens.refresh,
        }),
    ))
}

/// Login with email or username
///
/// An identifier containing `@` is matched against emails without regard to
/// case; anything else must equal a username exactly.
///
/// # Errors
///
/// - `400 Bad Request`: identifier or password missing
/// - `401 Unauthorized`: "Invalid credentials", whatever the reason
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (Some(identifier), Some(password)) = (
        req.username.filter(|u| !u.trim().is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };

    let user = identity::authenticate(&state.db, &identifier, &password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let tokens = jwt::TokenPair::issue(user.id, state.jwt_secret(), state.token_ttl())?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: user.into(),
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// Exchange a refresh token for a new access token
///
/// The user must still exist and be active.
///
/// # Errors
///
/// - `401 Unauthorized`: token invalid, expired, not a refresh token, or the
///   account is gone or blocked
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User account is inactive or does not exist".to_string()))?;

    let access_claims = jwt::Claims::with_expiration(
        user.id,
        jwt::TokenType::Access,
        state.token_ttl().access,
    );
    let access = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_request(password_confirm: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Amina".to_string(),
            last_name: String::new(),
            email: "amina@example.com".to_string(),
            password: "s3cret!".to_string(),
            password_confirm: password_confirm.to_string(),
        }
    }

    #[test]
    fn test_register_request_valid() {
        assert!(register_request("s3cret!").validate().is_ok());
    }

    #[test]
    fn test_register_request_password_mismatch() {
        let errors = register_request("other!").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirm"));
    }

    #[test]
    fn test_register_request_short_password_and_bad_email() {
        let mut req = register_request("abc");
        req.password = "abc".to_string();
        req.email = "not-an-email".to_string();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password_confirm"));
    }

    #[test]
    fn test_register_request_trims_before_validation() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "first_name": "  Amina ",
            "email": "  amina@example.com\n",
            "password": "s3cret!",
            "password_confirm": "s3cret!"
        }))
        .unwrap();

        assert_eq!(req.email, "amina@example.com");
        assert_eq!(req.first_name, "Amina");
        assert_eq!(req.last_name, "");
        assert!(req.validate().is_ok());

        let blank: RegisterRequest = serde_json::from_value(serde_json::json!({
            "first_name": "   ",
            "email": "amina@example.com",
            "password": "s3cret!",
            "password_confirm": "s3cret!"
        }))
        .unwrap();
        assert!(blank.validate().unwrap_err().field_errors().contains_key("first_name"));
    }

    #[test]
    fn test_login_request_aliases() {
        for key in ["username", "identifier", "email"] {
            let body = format!(r#"{{"{key}": "amina@example.com", "password": "x"}}"#);
            let req: LoginRequest = serde_json::from_str(&body).unwrap();
            assert_eq!(req.username.as_deref(), Some("amina@example.com"));
        }

        let empty: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.username.is_none());
        assert!(empty.password.is_none());
    }

    #[test]
    fn test_user_response_hides_password() {
        let user = User {
            id: 1,
            username: "amina@example.com".to_string(),
            email: "amina@example.com".to_string(),
            first_name: "Amina".to_string(),
            last_name: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "amina@example.com");
    }
}
