/// Request extractors shared by the route handlers
///
/// - [`CurrentUser`]: the authenticated caller, 401 when anonymous
/// - [`MaybeUser`]: the caller if authenticated, never rejects
/// - [`ValidatedJson`]: a JSON body that has passed `validator` checks

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use bitsa_shared::auth::{authorization::Actor, middleware::AuthContext};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use validator::Validate;

/// Authenticated caller placed in request extensions by the auth layer
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthContext);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                ApiError::Unauthorized("Authentication credentials were not provided".to_string())
            })
    }
}

/// Caller on routes where authentication is optional
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<AuthContext>);

impl MaybeUser {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(AuthContext::actor)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthContext>().cloned()))
    }
}

/// JSON body that is deserialized and then validated
///
/// Malformed JSON becomes `bad_request`; failed field rules become
/// `validation_error` with one detail per failure.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;

        value.validate().map_err(ApiError::from_validation)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let ValidatedJson(sample) =
            ValidatedJson::<Sample>::from_request(json_request(r#"{"title":"Hi"}"#), &())
                .await
                .unwrap();
        assert_eq!(sample.title, "Hi");
    }

    #[tokio::test]
    async fn test_validated_json_reports_field_errors() {
        let err = ValidatedJson::<Sample>::from_request(json_request(r#"{"title":""}"#), &())
            .await
            .unwrap_err();

        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details[0].field, "title");
                assert_eq!(details[0].message, "Title is required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validated_json_rejects_malformed_body() {
        let err = ValidatedJson::<Sample>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_current_user_requires_context() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let err = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(user.is_none());
    }
}
