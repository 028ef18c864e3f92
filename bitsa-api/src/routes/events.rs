/// Event endpoints
///
/// Events are public unless their organizer or staff make them private.
/// Private events behave as missing for everyone but the organizer and
/// staff, RSVP included.
///
/// # Endpoints
///
/// - `GET /events` - List events (`organizer`, `search`, `upcoming` filters)
/// - `POST /events` - Create an event
/// - `GET /events/:id` - Retrieve an event
/// - `PUT|PATCH /events/:id` - Update an event
/// - `DELETE /events/:id` - Delete an event
/// - `POST /events/:id/rsvp` - Join or leave
/// - `PATCH /events/:id/publish` - Make public (staff)
/// - `PATCH /events/:id/unpublish` - Make private (staff)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, MaybeUser, ValidatedJson},
    routes::{double_option, is_truthy, non_empty, parse_id, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bitsa_shared::{
    auth::authorization::{authorize, authorize_visibility, Action, Actor, Resource},
    models::{
        event::{CreateEvent, Event, EventFilter, EventStatus, RsvpAction, UpdateEvent},
        photo::resolve_image_url,
        ListScope,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Event as returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub organizer: i64,
    pub organizer_name: String,
    pub organizer_email: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub is_public: bool,
    pub capacity: Option<i32>,
    pub attendees_count: i64,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    fn new(event: Event, media_base_url: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            status: event.status(now),
            image_url: event
                .image
                .as_deref()
                .map(|image| resolve_image_url(image, media_base_url)),
            id: event.id,
            title: event.title,
            description: event.description,
            organizer: event.organizer_id,
            organizer_name: event.organizer_name,
            organizer_email: event.organizer_email,
            location: event.location,
            start_time: event.start_time,
            end_time: event.end_time,
            is_public: event.is_public,
            capacity: event.capacity,
            attendees_count: event.attendees_count,
            image: event.image,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: String,

    pub start_time: DateTime<Utc>,

    pub end_time: Option<DateTime<Utc>>,

    #[serde(default = "default_public")]
    pub is_public: bool,

    /// Null or absent means unlimited
    pub capacity: Option<i32>,

    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: Option<String>,
}

fn default_public() -> bool {
    true
}

/// Partial update; `null` clears `end_time`, `capacity` or `image`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<DateTime<Utc>>>,

    pub is_public: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub capacity: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(min = 1, max = 512, message = "Image must be 1-512 characters"))]
    pub image: Option<Option<String>>,
}

impl From<UpdateEventRequest> for UpdateEvent {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            location: req.location,
            start_time: req.start_time,
            end_time: req.end_time,
            is_public: req.is_public,
            capacity: req.capacity,
            image: req.image,
        }
    }
}

/// `GET /events` query string
#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub organizer: Option<String>,
    pub search: Option<String>,
    pub upcoming: Option<String>,
}

/// Response of an RSVP toggle
#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpResponse {
    pub status: RsvpAction,
    pub attendees_count: i64,
}

async fn load_event(state: &AppState, id: i64) -> ApiResult<Event> {
    Event::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
}

/// List events, latest start first
///
/// `upcoming=1|true|yes` keeps only events that have not started yet.
pub async fn list_events(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<EventListQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<EventResponse>>> {
    let actor = user.actor();
    let filter = EventFilter {
        organizer_id: parse_id(query.organizer.as_deref()),
        search: non_empty(query.search),
        upcoming: is_truthy(query.upcoming.as_deref()),
    };

    let events = Event::list(
        &state.db,
        &filter,
        ListScope::for_actor(actor.as_ref()),
        page.limit(),
        page.offset(),
    )
    .await?;

    let now = Utc::now();
    let media = state.media_base_url();
    Ok(Json(
        events
            .into_iter()
            .map(|event| EventResponse::new(event, media, now))
            .collect(),
    ))
}

/// Create an event organized by the caller
///
/// # Errors
///
/// - `400 Bad Request`: negative capacity or `end_time` before `start_time`
/// - `401 Unauthorized`: anonymous
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    let actor = user.actor();
    authorize_visibility::<Event>(&actor, Event::VISIBLE_BY_DEFAULT, req.is_public)?;

    let event = Event::create(
        &state.db,
        CreateEvent {
            title: req.title,
            description: req.description,
            organizer_id: actor.user_id,
            location: req.location,
            start_time: req.start_time,
            end_time: req.end_time,
            is_public: req.is_public,
            capacity: req.capacity,
            image: req.image,
        },
    )
    .await?;

    tracing::info!(event_id = event.id, organizer_id = actor.user_id, "Event created");

    Ok((
        StatusCode::CREATED,
        Json(EventResponse::new(event, state.media_base_url(), Utc::now())),
    ))
}

/// Retrieve an event; private events are 404 to other users
pub async fn get_event(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<EventResponse>> {
    let event = load_event(&state, id).await?;
    authorize(user.actor().as_ref(), Action::Read, &event)?;

    Ok(Json(EventResponse::new(event, state.media_base_url(), Utc::now())))
}

/// Update an event (organizer or staff)
///
/// # Errors
///
/// - `400 Bad Request`: capacity below the current attendee count, negative
///   capacity, or an end before the start; the event is left unchanged
/// - `403 Forbidden`: not the organizer and not staff, or a non-staff caller
///   asked to make a private event public
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateEventRequest>,
) -> ApiResult<Json<EventResponse>> {
    let actor = user.actor();
    let event = load_event(&state, id).await?;
    authorize(Some(&actor), Action::Update, &event)?;

    if let Some(requested) = req.is_public {
        authorize_visibility::<Event>(&actor, event.is_public, requested)?;
    }

    let updated = Event::update(&state.db, id, req.into())
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    tracing::debug!(event_id = id, by = actor.user_id, "Event updated");

    Ok(Json(EventResponse::new(updated, state.media_base_url(), Utc::now())))
}

/// Delete an event (organizer or staff)
pub async fn delete_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let actor = user.actor();
    let event = load_event(&state, id).await?;
    authorize(Some(&actor), Action::Delete, &event)?;

    Event::delete(&state.db, id).await?;

    tracing::info!(event_id = id, by = actor.user_id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle the caller's attendance
///
/// # Response
///
/// ```json
/// { "status": "added", "attendees_count": 12 }
/// ```
///
/// # Errors
///
/// - `400 Bad Request` (`capacity_exceeded`): joining a full event
/// - `404 Not Found`: unknown event, or a private event of someone else
pub async fn rsvp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<RsvpResponse>> {
    let actor = user.actor();
    let event = load_event(&state, id).await?;
    authorize(Some(&actor), Action::Rsvp, &event)?;

    let outcome = Event::toggle_rsvp(&state.db, id, actor.user_id).await?;

    Ok(Json(RsvpResponse {
        status: outcome.action,
        attendees_count: outcome.attendees_count,
    }))
}

async fn transition(
    state: &AppState,
    actor: &Actor,
    id: i64,
    public: bool,
) -> ApiResult<Json<EventResponse>> {
    let event = load_event(state, id).await?;
    let action = if public { Action::Publish } else { Action::Unpublish };
    authorize(Some(actor), action, &event)?;

    let updated = Event::set_public(&state.db, id, public)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    tracing::info!(event_id = id, by = actor.user_id, public, "Event visibility changed");

    Ok(Json(EventResponse::new(updated, state.media_base_url(), Utc::now())))
}

/// Make an event public (staff only)
pub async fn publish_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<EventResponse>> {
    transition(&state, &user.actor(), id, true).await
}

/// Make an event private (staff only)
pub async fn unpublish_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<EventResponse>> {
    transition(&state, &user.actor(), id, false).await
}
