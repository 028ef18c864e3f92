/// Event model, attendee set and RSVP engine
///
/// An event may carry a capacity. The number of attendees never exceeds it:
/// RSVPs and event writes both take a row lock on the event inside one
/// transaction before counting, so concurrent requests on the same event are
/// serialized and the check cannot race the write.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE events (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL,
///     organizer_id BIGINT NOT NULL REFERENCES users(id),
///     location VARCHAR(255) NOT NULL DEFAULT '',
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ,                 -- >= start_time
///     is_public BOOLEAN NOT NULL DEFAULT TRUE,
///     capacity INTEGER,                     -- NULL = unlimited, >= 0
///     image VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE event_attendees (
///     event_id BIGINT REFERENCES events(id) ON DELETE CASCADE,
///     user_id BIGINT REFERENCES users(id) ON DELETE CASCADE,
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (event_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bitsa_shared::models::event::{Event, RsvpAction};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, event_id: i64, user_id: i64) -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = Event::toggle_rsvp(&pool, event_id, user_id).await?;
/// match outcome.action {
///     RsvpAction::Added => println!("See you there ({} going)", outcome.attendees_count),
///     RsvpAction::Removed => println!("RSVP cancelled"),
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{like_pattern, ListScope};
use crate::auth::authorization::Resource;

/// Columns of an event joined with its organizer, selected from alias `e`
const EVENT_COLUMNS: &str = r#"
    e.id, e.title, e.description, e.organizer_id, e.location, e.start_time, e.end_time,
    e.is_public, e.capacity, e.image, e.created_at, e.updated_at,
    TRIM(u.first_name || ' ' || u.last_name) AS organizer_name,
    u.email AS organizer_email,
    (SELECT COUNT(*) FROM event_attendees a WHERE a.event_id = e.id) AS attendees_count
"#;

/// Where an event is in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    /// Status at `now`
    ///
    /// An event without an end time is a point in time: it is upcoming until
    /// it starts and completed from then on.
    pub fn at(start: DateTime<Utc>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        if now < start {
            return EventStatus::Upcoming;
        }

        match end {
            Some(end) if now < end => EventStatus::Ongoing,
            _ => EventStatus::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
        }
    }
}

/// Event with organizer display fields and attendee count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,

    /// Owner; fixed at creation
    pub organizer_id: i64,

    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    /// Private events are only visible to their organizer and staff
    pub is_public: bool,

    /// Maximum attendees; None means unlimited
    pub capacity: Option<i32>,

    /// Image URL or media path
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub organizer_name: String,
    pub organizer_email: String,
    pub attendees_count: i64,
}

/// Input for creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEvent {
    pub title: String,
    pub description: String,
    pub organizer_id: i64,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub capacity: Option<i32>,
    pub image: Option<String>,
}

/// Input for updating an event
///
/// Only `Some` fields are written. For the nullable columns, `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub is_public: Option<bool>,
    pub capacity: Option<Option<i32>>,
    pub image: Option<Option<String>>,
}

/// List filters; all optional and combined with AND
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Exact organizer id
    pub organizer_id: Option<i64>,

    /// Case-insensitive substring of title, description or location
    pub search: Option<String>,

    /// Only events starting now or later
    pub upcoming: bool,
}

/// Error type for event creation and updates
#[derive(Debug, thiserror::Error)]
pub enum EventWriteError {
    /// The new capacity would be below the number already attending
    #[error("Capacity ({capacity}) cannot be less than current attendees ({attendees})")]
    CapacityBelowAttendance { capacity: i32, attendees: i64 },

    #[error("Capacity cannot be negative")]
    NegativeCapacity,

    #[error("End time must not be before start time")]
    EndBeforeStart,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What an RSVP toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpAction {
    Added,
    Removed,
}

impl RsvpAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpAction::Added => "added",
            RsvpAction::Removed => "removed",
        }
    }
}

/// Result of a committed RSVP toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RsvpOutcome {
    pub action: RsvpAction,

    /// Attendee count after the toggle
    pub attendees_count: i64,
}

/// Error type for RSVP toggles
#[derive(Debug, thiserror::Error)]
pub enum RsvpError {
    #[error("Event not found")]
    NotFound,

    /// Joining would exceed the capacity; nothing was changed
    #[error("Event is full")]
    CapacityExceeded { capacity: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Decides what an RSVP toggle does, given the current state
///
/// Leaving always succeeds. Joining fails when a capacity is set and the
/// attendee count has already reached it.
pub fn decide_rsvp(
    is_member: bool,
    attendees: i64,
    capacity: Option<i32>,
) -> Result<RsvpAction, RsvpError> {
    if is_member {
        return Ok(RsvpAction::Removed);
    }

    match capacity {
        Some(capacity) if attendees >= i64::from(capacity) => {
            Err(RsvpError::CapacityExceeded { capacity })
        }
        _ => Ok(RsvpAction::Added),
    }
}

/// Checks a capacity against the current attendee count
pub fn validate_capacity(capacity: Option<i32>, attendees: i64) -> Result<(), EventWriteError> {
    match capacity {
        Some(capacity) if capacity < 0 => Err(EventWriteError::NegativeCapacity),
        Some(capacity) if i64::from(capacity) < attendees => {
            Err(EventWriteError::CapacityBelowAttendance { capacity, attendees })
        }
        _ => Ok(()),
    }
}

/// Checks that an event does not end before it starts
pub fn validate_schedule(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), EventWriteError> {
    match end {
        Some(end) if end < start => Err(EventWriteError::EndBeforeStart),
        _ => Ok(()),
    }
}

impl Resource for Event {
    const KIND: &'static str = "events";
    const VISIBLE_BY_DEFAULT: bool = true;

    fn owner_id(&self) -> i64 {
        self.organizer_id
    }

    fn is_visible(&self) -> bool {
        self.is_public
    }
}

impl Event {
    pub fn status(&self, now: DateTime<Utc>) -> EventStatus {
        EventStatus::at(self.start_time, self.end_time, now)
    }

    /// Creates a new event with no attendees
    ///
    /// # Errors
    ///
    /// - `NegativeCapacity` / `EndBeforeStart` for invalid input
    /// - `Database` if the insert fails
    pub async fn create(pool: &PgPool, data: CreateEvent) -> Result<Self, EventWriteError> {
        validate_capacity(data.capacity, 0)?;
        validate_schedule(data.start_time, data.end_time)?;

        let query = format!(
            r#"
            WITH e AS (
                INSERT INTO events
                    (title, description, organizer_id, location, start_time, end_time,
                     is_public, capacity, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
            )
            SELECT {EVENT_COLUMNS}
            FROM e JOIN users u ON u.id = e.organizer_id
            "#
        );

        let event = sqlx::query_as::<_, Event>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.organizer_id)
            .bind(data.location)
            .bind(data.start_time)
            .bind(data.end_time)
            .bind(data.is_public)
            .bind(data.capacity)
            .bind(data.image)
            .fetch_one(pool)
            .await?;

        Ok(event)
    }

    /// Finds an event by ID, regardless of visibility
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e JOIN users u ON u.id = e.organizer_id
            WHERE e.id = $1
            "#
        );

        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(event)
    }

    /// Whether any event already carries exactly this title
    pub async fn exists_with_title(pool: &PgPool, title: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE title = $1)")
            .bind(title)
            .fetch_one(pool)
            .await
    }

    /// Lists events by start time, latest first
    pub async fn list(
        pool: &PgPool,
        filter: &EventFilter,
        scope: ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events e JOIN users u ON u.id = e.organizer_id WHERE TRUE"
        ));

        scope.push_condition(&mut qb, "e.is_public", "e.organizer_id");

        if let Some(organizer_id) = filter.organizer_id {
            qb.push(" AND e.organizer_id = ").push_bind(organizer_id);
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            qb.push(" AND (e.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR e.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR e.location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if filter.upcoming {
            qb.push(" AND e.start_time >= NOW()");
        }

        qb.push(" ORDER BY e.start_time DESC, e.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let events = qb.build_query_as::<Event>().fetch_all(pool).await?;

        Ok(events)
    }

    /// Updates an event under its row lock
    ///
    /// The capacity and schedule are validated against the values the row
    /// will hold after the update, and the capacity against the attendee
    /// count read under the same lock. A rejected update changes nothing.
    ///
    /// # Returns
    ///
    /// The updated event, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateEvent,
    ) -> Result<Option<Self>, EventWriteError> {
        let mut tx = pool.begin().await?;

        let current: Option<(DateTime<Utc>, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT start_time, end_time FROM events WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((start_time, end_time)) = current else {
            return Ok(None);
        };

        if let Some(new_capacity) = data.capacity {
            let attendees = count_attendees(&mut tx, id).await?;
            validate_capacity(new_capacity, attendees)?;
        }

        validate_schedule(
            data.start_time.unwrap_or(start_time),
            data.end_time.unwrap_or(end_time),
        )?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("WITH e AS (UPDATE events SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(location) = data.location {
            qb.push(", location = ").push_bind(location);
        }
        if let Some(start_time) = data.start_time {
            qb.push(", start_time = ").push_bind(start_time);
        }
        if let Some(end_time) = data.end_time {
            qb.push(", end_time = ").push_bind(end_time);
        }
        if let Some(is_public) = data.is_public {
            qb.push(", is_public = ").push_bind(is_public);
        }
        if let Some(capacity) = data.capacity {
            qb.push(", capacity = ").push_bind(capacity);
        }
        if let Some(image) = data.image {
            qb.push(", image = ").push_bind(image);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(
            " RETURNING *) SELECT {EVENT_COLUMNS} FROM e JOIN users u ON u.id = e.organizer_id"
        ));

        let event = qb.build_query_as::<Event>().fetch_optional(&mut *tx).await?;

        tx.commit().await?;

        Ok(event)
    }

    /// Makes an event public or private
    pub async fn set_public(
        pool: &PgPool,
        id: i64,
        is_public: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            WITH e AS (
                UPDATE events SET is_public = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {EVENT_COLUMNS}
            FROM e JOIN users u ON u.id = e.organizer_id
            "#
        );

        let event = sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(is_public)
            .fetch_optional(pool)
            .await?;

        Ok(event)
    }

    /// Deletes an event and its attendee set
    ///
    /// # Returns
    ///
    /// True if the event was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Toggles `user_id`'s membership in the event's attendee set
    ///
    /// Runs in one transaction holding the event's row lock, so toggles on
    /// the same event are applied one at a time and the capacity check sees
    /// the count it guards.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event doesn't exist
    /// - `CapacityExceeded` if joining would go over capacity (nothing changes)
    /// - `Database` on database failure
    pub async fn toggle_rsvp(
        pool: &PgPool,
        event_id: i64,
        user_id: i64,
    ) -> Result<RsvpOutcome, RsvpError> {
        let mut tx = pool.begin().await?;

        let capacity: Option<i32> =
            sqlx::query_scalar::<_, Option<i32>>("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RsvpError::NotFound)?;

        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_attendees WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let attendees = count_attendees(&mut tx, event_id).await?;

        let action = decide_rsvp(is_member, attendees, capacity)?;

        let attendees_count = match action {
            RsvpAction::Removed => {
                sqlx::query("DELETE FROM event_attendees WHERE event_id = $1 AND user_id = $2")
                    .bind(event_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                attendees - 1
            }
            RsvpAction::Added => {
                sqlx::query(
                    r#"
                    INSERT INTO event_attendees (event_id, user_id)
                    VALUES ($1, $2)
                    ON CONFLICT (event_id, user_id) DO NOTHING
                    "#,
                )
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
                attendees + 1
            }
        };

        tx.commit().await?;

        tracing::debug!(
            event_id,
            user_id,
            action = action.as_str(),
            attendees_count,
            "RSVP toggled"
        );

        Ok(RsvpOutcome {
            action,
            attendees_count,
        })
    }

    /// Whether `user_id` is in the event's attendee set
    pub async fn is_attending(
        pool: &PgPool,
        event_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_attendees WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}

async fn count_attendees(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    event_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_rsvp_leave_always_succeeds() {
        assert_eq!(decide_rsvp(true, 10, Some(10)).unwrap(), RsvpAction::Removed);
        assert_eq!(decide_rsvp(true, 1, None).unwrap(), RsvpAction::Removed);
        // even if capacity was somehow exceeded
        assert_eq!(decide_rsvp(true, 12, Some(10)).unwrap(), RsvpAction::Removed);
    }

    #[test]
    fn test_rsvp_join_respects_capacity() {
        assert_eq!(decide_rsvp(false, 9, Some(10)).unwrap(), RsvpAction::Added);
        assert!(matches!(
            decide_rsvp(false, 10, Some(10)),
            Err(RsvpError::CapacityExceeded { capacity: 10 })
        ));
        assert!(matches!(
            decide_rsvp(false, 0, Some(0)),
            Err(RsvpError::CapacityExceeded { capacity: 0 })
        ));
    }

    #[test]
    fn test_rsvp_unlimited_capacity() {
        assert_eq!(decide_rsvp(false, 100_000, None).unwrap(), RsvpAction::Added);
    }

    #[test]
    fn test_rsvp_toggle_is_an_involution() {
        // Simulate one user toggling twice against the pure decision
        let capacity = Some(1);
        let mut members = 0i64;
        let mut is_member = false;

        for expected in [RsvpAction::Added, RsvpAction::Removed, RsvpAction::Added] {
            let action = decide_rsvp(is_member, members, capacity).unwrap();
            assert_eq!(action, expected);
            is_member = action == RsvpAction::Added;
            members = if is_member { members + 1 } else { members - 1 };
        }
        assert_eq!(members, 1);
    }

    #[test]
    fn test_capacity_full_message() {
        assert_eq!(RsvpError::CapacityExceeded { capacity: 3 }.to_string(), "Event is full");
    }

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(None, 50).is_ok());
        assert!(validate_capacity(Some(5), 5).is_ok());
        assert!(validate_capacity(Some(0), 0).is_ok());
        assert!(matches!(
            validate_capacity(Some(4), 5),
            Err(EventWriteError::CapacityBelowAttendance { capacity: 4, attendees: 5 })
        ));
        assert!(matches!(
            validate_capacity(Some(-1), 0),
            Err(EventWriteError::NegativeCapacity)
        ));
    }

    #[test]
    fn test_validate_schedule() {
        let start = Utc::now();
        assert!(validate_schedule(start, None).is_ok());
        assert!(validate_schedule(start, Some(start)).is_ok());
        assert!(validate_schedule(start, Some(start + Duration::hours(2))).is_ok());
        assert!(matches!(
            validate_schedule(start, Some(start - Duration::minutes(1))),
            Err(EventWriteError::EndBeforeStart)
        ));
    }

    #[test]
    fn test_status_with_end_time() {
        let start = Utc::now();
        let end = start + Duration::hours(2);

        assert_eq!(
            EventStatus::at(start, Some(end), start - Duration::minutes(1)),
            EventStatus::Upcoming
        );
        assert_eq!(EventStatus::at(start, Some(end), start), EventStatus::Ongoing);
        assert_eq!(
            EventStatus::at(start, Some(end), start + Duration::hours(1)),
            EventStatus::Ongoing
        );
        assert_eq!(EventStatus::at(start, Some(end), end), EventStatus::Completed);
    }

    #[test]
    fn test_status_without_end_time() {
        let start = Utc::now();

        assert_eq!(
            EventStatus::at(start, None, start - Duration::seconds(1)),
            EventStatus::Upcoming
        );
        assert_eq!(EventStatus::at(start, None, start), EventStatus::Completed);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&EventStatus::Ongoing).unwrap(), "\"ongoing\"");
        assert_eq!(EventStatus::Completed.as_str(), "completed");
    }
}
