/// Blog post endpoints
///
/// Posts start unpublished. Anyone may read published posts; drafts are
/// visible only to their author and to staff. Publishing is a staff action,
/// while an author may always take their own post offline.
///
/// # Endpoints
///
/// - `GET /blogs` - List posts (`author`, `category`, `search` filters)
/// - `POST /blogs` - Create a post
/// - `GET /blogs/:id` - Retrieve a post
/// - `PUT|PATCH /blogs/:id` - Update a post
/// - `DELETE /blogs/:id` - Delete a post
/// - `PATCH /blogs/:id/publish` - Publish (staff)
/// - `PATCH /blogs/:id/unpublish` - Unpublish (staff)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, MaybeUser, ValidatedJson},
    routes::{double_option, non_empty, parse_id, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bitsa_shared::{
    auth::authorization::{authorize, authorize_visibility, Action, Actor, Resource},
    models::{
        blog_post::{
            BlogPost, BlogPostFilter, CreateBlogPost, UpdateBlogPost, DEFAULT_CATEGORY,
            DEFAULT_READ_TIME,
        },
        photo::resolve_image_url,
        ListScope,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Post as returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author: i64,
    pub author_name: String,
    pub author_email: String,
    pub category: String,
    pub tags: String,
    pub tag_list: Vec<String>,
    pub read_time: i32,
    pub is_published: bool,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl PostResponse {
    fn new(post: BlogPost, media_base_url: Option<&str>) -> Self {
        Self {
            tag_list: post.tag_list(),
            image_url: post
                .image
                .as_deref()
                .map(|image| resolve_image_url(image, media_base_url)),
            id: post.id,
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            author: post.author_id,
            author_name: post.author_name,
            author_email: post.author_email,
            category: post.category,
            tags: post.tags,
            read_time: post.read_time,
            is_published: post.is_published,
            image: post.image,
            created_at: post.created_at,
            updated_at: post.updated_at,
            published_at: post.published_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    #[serde(default)]
    pub excerpt: String,

    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    #[validate(length(max = 500, message = "Tags must be at most 500 characters"))]
    pub tags: String,

    #[validate(range(min = 1, message = "Read time must be at least 1 minute"))]
    pub read_time: Option<i32>,

    #[serde(default)]
    pub is_published: bool,

    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: Option<String>,
}

/// Partial update; absent fields are left alone, `"image": null` clears it
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,

    pub excerpt: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 500, message = "Tags must be at most 500 characters"))]
    pub tags: Option<String>,

    #[validate(range(min = 1, message = "Read time must be at least 1 minute"))]
    pub read_time: Option<i32>,

    pub is_published: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: Option<Option<String>>,
}

impl From<UpdatePostRequest> for UpdateBlogPost {
    fn from(req: UpdatePostRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            category: req.category,
            tags: req.tags,
            read_time: req.read_time,
            is_published: req.is_published,
            image: req.image,
        }
    }
}

/// `GET /blogs` query string
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub author: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

async fn load_post(state: &AppState, id: i64) -> ApiResult<BlogPost> {
    BlogPost::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// List posts, newest first
///
/// Staff see every post, a signed-in user sees published posts plus their
/// own drafts, anonymous callers see published posts only.
pub async fn list_posts(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<PostListQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let actor = user.actor();
    let filter = BlogPostFilter {
        author_id: parse_id(query.author.as_deref()),
        category: non_empty(query.category),
        search: non_empty(query.search),
    };

    let posts = BlogPost::list(
        &state.db,
        &filter,
        ListScope::for_actor(actor.as_ref()),
        page.limit(),
        page.offset(),
    )
    .await?;

    let media = state.media_base_url();
    Ok(Json(
        posts
            .into_iter()
            .map(|post| PostResponse::new(post, media))
            .collect(),
    ))
}

/// Create a post owned by the caller
///
/// # Errors
///
/// - `401 Unauthorized`: anonymous
/// - `403 Forbidden`: a non-staff caller asked for `is_published: true`
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    let actor = user.actor();
    authorize_visibility::<BlogPost>(&actor, BlogPost::VISIBLE_BY_DEFAULT, req.is_published)?;

    let post = BlogPost::create(
        &state.db,
        CreateBlogPost {
            title: req.title,
            content: req.content,
            excerpt: req.excerpt,
            author_id: actor.user_id,
            category: req.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            tags: req.tags,
            read_time: req.read_time.unwrap_or(DEFAULT_READ_TIME),
            is_published: req.is_published,
            image: req.image,
        },
    )
    .await?;

    tracing::info!(post_id = post.id, author_id = actor.user_id, "Blog post created");

    Ok((
        StatusCode::CREATED,
        Json(PostResponse::new(post, state.media_base_url())),
    ))
}

/// Retrieve a post; drafts are 404 to anyone but their author and staff
pub async fn get_post(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<PostResponse>> {
    let post = load_post(&state, id).await?;
    authorize(user.actor().as_ref(), Action::Read, &post)?;

    Ok(Json(PostResponse::new(post, state.media_base_url())))
}

/// Update a post (author or staff)
///
/// The author may set `is_published: false`; setting it to `true` on a
/// draft requires staff.
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let actor = user.actor();
    let post = load_post(&state, id).await?;
    authorize(Some(&actor), Action::Update, &post)?;

    if let Some(requested) = req.is_published {
        authorize_visibility::<BlogPost>(&actor, post.is_published, requested)?;
    }

    let updated = BlogPost::update(&state.db, id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    tracing::debug!(post_id = id, by = actor.user_id, "Blog post updated");

    Ok(Json(PostResponse::new(updated, state.media_base_url())))
}

/// Delete a post (author or staff)
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let actor = user.actor();
    let post = load_post(&state, id).await?;
    authorize(Some(&actor), Action::Delete, &post)?;

    BlogPost::delete(&state.db, id).await?;

    tracing::info!(post_id = id, by = actor.user_id, "Blog post deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn transition(
    state: &AppState,
    actor: &Actor,
    id: i64,
    publish: bool,
) -> ApiResult<Json<PostResponse>> {
    let post = load_post(state, id).await?;
    let action = if publish { Action::Publish } else { Action::Unpublish };
    authorize(Some(actor), action, &post)?;

    let updated = BlogPost::set_published(&state.db, id, publish)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    tracing::info!(post_id = id, by = actor.user_id, published = publish, "Blog post transition");

    Ok(Json(PostResponse::new(updated, state.media_base_url())))
}

/// Publish a post (staff only); stamps `published_at` the first time
pub async fn publish_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<PostResponse>> {
    transition(&state, &user.actor(), id, true).await
}

/// Unpublish a post (staff only); `published_at` is kept
pub async fn unpublish_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<PostResponse>> {
    transition(&state, &user.actor(), id, false).await
}
