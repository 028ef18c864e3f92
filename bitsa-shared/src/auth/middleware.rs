/// Request authentication for Axum
///
/// Resolves the `Authorization: Bearer <access token>` header of an incoming
/// request into an [`AuthContext`]. The user row is loaded on every request,
/// so blocking an account or changing its staff flag takes effect at once
/// rather than when the token expires.
///
/// # Request Extensions
///
/// After successful authentication the API layer inserts an `AuthContext`
/// into the request extensions, where handlers pick it up with
/// `Extension<AuthContext>` (required) or `Option<Extension<AuthContext>>`
/// (optional).
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use bitsa_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.username)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::authorization::Actor;
use super::jwt::{validate_access_token, JwtError};
use crate::models::user::User;

/// Authenticated caller, as seen by handlers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl AuthContext {
    /// Builds the context from a freshly loaded user row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }

    /// The caller as an authorization subject
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            is_staff: self.is_staff,
        }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization header is not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user is gone or blocked
    #[error("User account is inactive or does not exist")]
    InactiveAccount,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Extracts the bearer token from request headers
///
/// # Returns
///
/// - `Ok(None)` if there is no `Authorization` header at all
/// - `Ok(Some(token))` for a well-formed `Bearer <token>` header
///
/// # Errors
///
/// Returns `AuthError::InvalidFormat` if the header is present but is not a
/// bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Invalid authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    Ok(Some(token))
}

/// Validates an access token and loads the user it belongs to
///
/// # Errors
///
/// - `InvalidToken` if the token is malformed, expired, signed with another
///   key, or is a refresh token
/// - `InactiveAccount` if the user no longer exists or is blocked
/// - `DatabaseError` if the lookup fails
pub async fn authenticate_token(
    pool: &PgPool,
    secret: &str,
    token: &str,
) -> Result<AuthContext, AuthError> {
    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .filter(|u| u.is_active)
        .ok_or(AuthError::InactiveAccount)?;

    Ok(AuthContext::from_user(&user))
}

/// Authenticates a request from its headers, if it carries credentials
///
/// `Ok(None)` means anonymous. A present but bad credential is always an
/// error, even on routes where authentication is optional.
pub async fn authenticate_headers(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AuthError> {
    match bearer_token(headers)? {
        Some(token) => authenticate_token(pool, secret, token).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_auth_context_from_user() {
        let user = User {
            id: 12,
            username: "staffer".to_string(),
            email: "staffer@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            is_staff: true,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        };

        let context = AuthContext::from_user(&user);
        assert_eq!(context.user_id, 12);
        assert_eq!(context.username, "staffer");
        assert!(context.is_staff);

        let actor = context.actor();
        assert_eq!(actor.user_id, 12);
        assert!(actor.is_staff);
    }

    #[test]
    fn test_bearer_token_absent() {
        assert!(bearer_token(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_bearer_token_present() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_bad_format() {
        assert!(matches!(
            bearer_token(&headers_with("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }
}
