/// Photo gallery endpoints
///
/// Photos are always public. Only the uploader or staff may change or
/// remove one.
///
/// # Endpoints
///
/// - `GET /gallery/photos` - List photos, newest first
/// - `POST /gallery/photos` - Add a photo
/// - `GET /gallery/photos/:id` - Retrieve a photo
/// - `PUT|PATCH /gallery/photos/:id` - Update a photo
/// - `DELETE /gallery/photos/:id` - Delete a photo

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, MaybeUser, ValidatedJson},
    routes::Pagination,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bitsa_shared::{
    auth::authorization::{authorize, Action},
    models::photo::{CreatePhoto, Photo, UpdatePhoto},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub image_url: String,
    pub uploaded_by: i64,
    pub uploaded_by_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl PhotoResponse {
    fn new(photo: Photo, media_base_url: Option<&str>) -> Self {
        Self {
            image_url: photo.image_url(media_base_url),
            id: photo.id,
            title: photo.title,
            description: photo.description,
            image: photo.image,
            uploaded_by: photo.uploaded_by,
            uploaded_by_name: photo.uploaded_by_name,
            uploaded_at: photo.uploaded_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePhotoRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// URL or media-relative path
    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePhotoRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: Option<String>,
}

async fn load_photo(state: &AppState, id: i64) -> ApiResult<Photo> {
    Photo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))
}

pub async fn list_photos(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<PhotoResponse>>> {
    let photos = Photo::list(&state.db, page.limit(), page.offset()).await?;

    let media = state.media_base_url();
    Ok(Json(
        photos
            .into_iter()
            .map(|photo| PhotoResponse::new(photo, media))
            .collect(),
    ))
}

/// Add a photo; the caller becomes its uploader
pub async fn create_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePhotoRequest>,
) -> ApiResult<(StatusCode, Json<PhotoResponse>)> {
    let actor = user.actor();

    let photo = Photo::create(
        &state.db,
        CreatePhoto {
            title: req.title,
            description: req.description,
            image: req.image,
            uploaded_by: actor.user_id,
        },
    )
    .await?;

    tracing::info!(photo_id = photo.id, uploaded_by = actor.user_id, "Photo added");

    Ok((
        StatusCode::CREATED,
        Json(PhotoResponse::new(photo, state.media_base_url())),
    ))
}

pub async fn get_photo(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<PhotoResponse>> {
    let photo = load_photo(&state, id).await?;
    authorize(user.actor().as_ref(), Action::Read, &photo)?;

    Ok(Json(PhotoResponse::new(photo, state.media_base_url())))
}

/// Update a photo (uploader or staff)
pub async fn update_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePhotoRequest>,
) -> ApiResult<Json<PhotoResponse>> {
    let actor = user.actor();
    let photo = load_photo(&state, id).await?;
    authorize(Some(&actor), Action::Update, &photo)?;

    let updated = Photo::update(
        &state.db,
        id,
        UpdatePhoto {
            title: req.title,
            description: req.description,
            image: req.image,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;

    Ok(Json(PhotoResponse::new(updated, state.media_base_url())))
}

/// Delete a photo (uploader or staff)
pub async fn delete_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let actor = user.actor();
    let photo = load_photo(&state, id).await?;
    authorize(Some(&actor), Action::Delete, &photo)?;

    Photo::delete(&state.db, id).await?;

    tracing::info!(photo_id = id, by = actor.user_id, "Photo deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_response_resolves_image_url() {
        let photo = Photo {
            id: 5,
            title: "Graduation".to_string(),
            description: String::new(),
            image: "gallery/grad.jpg".to_string(),
            uploaded_by: 2,
            uploaded_at: Utc::now(),
            uploaded_by_name: "Amina Otieno".to_string(),
        };

        let response = PhotoResponse::new(photo, Some("https://media.bitsa.dev/"));
        assert_eq!(response.image_url, "https://media.bitsa.dev/gallery/grad.jpg");
        assert_eq!(response.image, "gallery/grad.jpg");
    }

    #[test]
    fn test_create_request_requires_image() {
        let req: CreatePhotoRequest =
            serde_json::from_str(r#"{"title": "Graduation", "image": ""}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("image"));
    }
}
