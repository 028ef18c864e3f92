/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use bitsa_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = bitsa_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use bitsa_shared::auth::{jwt::TokenTtl, middleware::authenticate_headers};
use sqlx::PgPool;
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn token_ttl(&self) -> TokenTtl {
        self.config.jwt.ttl()
    }

    pub fn media_base_url(&self) -> Option<&str> {
        self.config.media.base_url.as_deref()
    }
}

/// Every endpoint, relative to its mount point
///
/// A trailing slash is accepted on all of them (see [`build_app`]).
///
/// ```text
/// /health                              GET
/// /auth/register                       POST
/// /auth/login                          POST
/// /auth/refresh                        POST
/// /auth/users                          GET    (staff)
/// /auth/users/add                      POST   (staff)
/// /auth/users/:id/toggle-block         PATCH  (staff)
/// /blogs                               GET POST
/// /blogs/:id                           GET PUT PATCH DELETE
/// /blogs/:id/publish | /unpublish      PATCH  (staff)
/// /events                              GET POST
/// /events/:id                          GET PUT PATCH DELETE
/// /events/:id/rsvp                     POST
/// /events/:id/publish | /unpublish     PATCH  (staff)
/// /gallery/photos                      GET POST
/// /gallery/photos/:id                  GET PUT PATCH DELETE
/// ```
fn api_routes() -> Router<AppState> {
    use crate::routes::{auth, blogs, events, health, photos, users};

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/users", get(users::list_users))
        .route("/users/add", post(users::add_user))
        .route("/users/:id/toggle-block", patch(users::toggle_block));

    let photo_routes = Router::new()
        .route("/photos", get(photos::list_photos).post(photos::create_photo))
        .route(
            "/photos/:id",
            get(photos::get_photo)
                .put(photos::update_photo)
                .patch(photos::update_photo)
                .delete(photos::delete_photo),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes)
        .route("/blogs", get(blogs::list_posts).post(blogs::create_post))
        .route(
            "/blogs/:id",
            get(blogs::get_post)
                .put(blogs::update_post)
                .patch(blogs::update_post)
                .delete(blogs::delete_post),
        )
        .route("/blogs/:id/publish", patch(blogs::publish_post))
        .route("/blogs/:id/unpublish", patch(blogs::unpublish_post))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/rsvp", post(events::rsvp))
        .route("/events/:id/publish", patch(events::publish_event))
        .route("/events/:id/unpublish", patch(events::unpublish_event))
        .nest("/gallery", photo_routes)
}

/// Builds the complete Axum router with all routes and middleware
///
/// Routes are mounted twice, at `/` and under `/api`.
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Request tracing (tower-http TraceLayer)
/// 4. Bearer authentication; attaches an `AuthContext` when a token is sent
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(api_routes())
        .nest("/api", api_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// The router wrapped so that `/blogs/1/` and `/blogs/1` are the same route
///
/// Path normalization has to happen before routing, so it wraps the whole
/// router instead of being one of its layers.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}

/// Bearer authentication middleware
///
/// Requests without an `Authorization` header pass through anonymously.
/// A header that is present must carry a valid access token for an active
/// user, otherwise the request is rejected before reaching a handler.
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate_headers(&state.db, state.jwt_secret(), req.headers()).await?;

    if let Some(context) = context {
        tracing::debug!(user_id = context.user_id, "Authenticated request");
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}
