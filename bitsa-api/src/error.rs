/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`. Failures become a JSON body of the
/// form `{"error": code, "message": text, "details": [...]}` with a matching
/// status code; internal failures are logged and replaced with a generic
/// message.
///
/// # Example
///
/// ```
/// use bitsa_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Post not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bitsa_shared::auth::{
    authorization::AuthzError,
    jwt::JwtError,
    middleware::AuthError,
    password::PasswordError,
};
use bitsa_shared::models::event::{EventWriteError, RsvpError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (400)
    BadRequest(String),

    /// Authentication missing or denied (401)
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Field-level validation errors (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Event capacity reached (400)
    CapacityExceeded(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// A validation error on a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    /// Converts `validator` errors into field details, sorted by field name
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::ValidationError(_)
            | ApiError::CapacityExceeded(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Request validation failed".to_string());
                ("validation_error", message, Some(errors))
            }
            ApiError::CapacityExceeded(msg) => ("capacity_exceeded", msg, None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "An internal error occurred".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or_default();
                    if constraint.contains("email") {
                        return ApiError::field("email", "Email already exists");
                    }
                    if constraint.contains("username") {
                        return ApiError::field("username", "Username already exists");
                    }
                    return ApiError::BadRequest("Duplicate value".to_string());
                }

                if db_err.is_check_violation() {
                    return ApiError::BadRequest(format!(
                        "Invalid value ({})",
                        db_err.constraint().unwrap_or("check")
                    ));
                }

                if db_err.is_foreign_key_violation() {
                    return ApiError::BadRequest("Referenced record does not exist".to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert request authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::InactiveAccount => {
                ApiError::Unauthorized("User account is inactive or does not exist".to_string())
            }
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => {
                ApiError::Unauthorized("Authentication credentials were not provided".to_string())
            }
            AuthzError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthzError::NotVisible => ApiError::NotFound("Not found".to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Convert RSVP errors to API errors
impl From<RsvpError> for ApiError {
    fn from(err: RsvpError) -> Self {
        match err {
            RsvpError::NotFound => ApiError::NotFound("Event not found".to_string()),
            RsvpError::CapacityExceeded { .. } => ApiError::CapacityExceeded(err.to_string()),
            RsvpError::Database(e) => e.into(),
        }
    }
}

/// Convert event write errors to API errors
impl From<EventWriteError> for ApiError {
    fn from(err: EventWriteError) -> Self {
        match err {
            EventWriteError::CapacityBelowAttendance { .. } | EventWriteError::NegativeCapacity => {
                ApiError::field("capacity", err.to_string())
            }
            EventWriteError::EndBeforeStart => ApiError::field("end_time", err.to_string()),
            EventWriteError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Post not found".to_string());
        assert_eq!(err.to_string(), "Not found: Post not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::field("email", "x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::CapacityExceeded("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InternalError("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_capacity_exceeded_body() {
        let err: ApiError = RsvpError::CapacityExceeded { capacity: 10 }.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "capacity_exceeded");
        assert_eq!(body["message"], "Event is full");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let err = ApiError::ValidationError(vec![
            ValidationErrorDetail::new("email", "Email already exists"),
            ValidationErrorDetail::new("password", "Too short"),
        ]);

        let body = body_json(err.into_response()).await;
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["message"], "Email already exists");
        assert_eq!(body["details"][1]["field"], "password");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let err = ApiError::InternalError("connection refused at 10.0.0.5".to_string());
        let body = body_json(err.into_response()).await;

        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_authz_mapping() {
        assert!(matches!(ApiError::from(AuthzError::Unauthenticated), ApiError::Unauthorized(_)));
        assert!(matches!(
            ApiError::from(AuthzError::Forbidden("no".into())),
            ApiError::Forbidden(m) if m == "no"
        ));
        assert!(matches!(ApiError::from(AuthzError::NotVisible), ApiError::NotFound(_)));
    }

    #[test]
    fn test_event_write_mapping() {
        let err: ApiError = EventWriteError::CapacityBelowAttendance {
            capacity: 2,
            attendees: 3,
        }
        .into();

        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "capacity");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_jwt_mapping() {
        assert!(matches!(ApiError::from(JwtError::Expired), ApiError::Unauthorized(_)));
        assert!(matches!(
            ApiError::from(JwtError::CreateError("x".into())),
            ApiError::InternalError(_)
        ));
    }
}
