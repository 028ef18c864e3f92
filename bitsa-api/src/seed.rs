/// Demo data for local development
///
/// Creates two organizers, two attendees and five sample events with mixed
/// capacity and visibility, then RSVPs the attendees to some of them.
/// Running it again is harmless: accounts are reused by username and an
/// event is skipped when one with the same title already exists.
///
/// # Example
///
/// ```no_run
/// # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
/// let report = bitsa_api::seed::seed_events(&pool).await?;
/// println!("created {}, skipped {}", report.created, report.skipped);
/// # Ok(())
/// # }
/// ```

use anyhow::{Context, Result};
use bitsa_shared::{
    auth::password,
    models::{
        event::{CreateEvent, Event},
        user::{CreateUser, User},
    },
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

/// Password every seeded account gets
pub const SEED_PASSWORD: &str = "password123";

pub const ORGANIZERS: [&str; 2] = ["organizer1", "organizer2"];
pub const ATTENDEES: [&str; 2] = ["attendee1", "attendee2"];

const SAMPLE_EVENTS: i64 = 5;
const CAPACITIES: [Option<i32>; 4] = [None, Some(10), Some(25), Some(50)];

/// One planned sample event
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub is_public: bool,
    pub image: String,

    /// Index into [`ORGANIZERS`]
    pub organizer: usize,

    /// Indexes into [`ATTENDEES`]
    pub attendees: Vec<usize>,
}

/// Outcome of a seed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// The sample events, scheduled relative to `now`
///
/// Event `i` starts `i` days out and lasts two hours. Odd events belong to
/// the first organizer, every third event is private.
pub fn sample_events(now: DateTime<Utc>) -> Vec<SampleEvent> {
    (1..=SAMPLE_EVENTS)
        .map(|i| {
            let title = format!("Sample Event {i}");
            let start_time = now + Duration::days(i);

            let mut attendees = Vec::new();
            if i % 2 == 1 {
                attendees.push(0);
            }
            if i % 3 != 0 {
                attendees.push(1);
            }

            SampleEvent {
                description: format!(
                    "This is a description for {title}. Use this to verify UI rendering."
                ),
                title,
                location: format!("Venue {i}"),
                start_time,
                end_time: start_time + Duration::hours(2),
                capacity: CAPACITIES[i as usize % CAPACITIES.len()],
                is_public: i % 3 != 0,
                image: format!("https://picsum.photos/seed/event{i}/800/600"),
                organizer: if i % 2 == 1 { 0 } else { 1 },
                attendees,
            }
        })
        .collect()
}

/// Finds an account by username, creating it with [`SEED_PASSWORD`] if missing
async fn get_or_create_user(pool: &PgPool, username: &str) -> Result<User> {
    if let Some(user) = User::find_by_username(pool, username).await? {
        return Ok(user);
    }

    let user = User::create(
        pool,
        CreateUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: password::hash_password(SEED_PASSWORD)?,
            is_staff: false,
        },
    )
    .await
    .with_context(|| format!("Failed to create seed user {username}"))?;

    tracing::info!(user_id = user.id, username, "Seed user created");
    Ok(user)
}

/// Seeds the sample accounts and events
pub async fn seed_events(pool: &PgPool) -> Result<SeedReport> {
    let mut organizers = Vec::with_capacity(ORGANIZERS.len());
    for username in ORGANIZERS {
        organizers.push(get_or_create_user(pool, username).await?);
    }

    let mut attendees = Vec::with_capacity(ATTENDEES.len());
    for username in ATTENDEES {
        attendees.push(get_or_create_user(pool, username).await?);
    }

    let mut report = SeedReport::default();

    for sample in sample_events(Utc::now()) {
        if Event::exists_with_title(pool, &sample.title).await? {
            report.skipped += 1;
            continue;
        }

        let event = Event::create(
            pool,
            CreateEvent {
                title: sample.title.clone(),
                description: sample.description,
                organizer_id: organizers[sample.organizer].id,
                location: sample.location,
                start_time: sample.start_time,
                end_time: Some(sample.end_time),
                is_public: sample.is_public,
                capacity: sample.capacity,
                image: Some(sample.image),
            },
        )
        .await
        .with_context(|| format!("Failed to create {}", sample.title))?;

        for index in &sample.attendees {
            Event::toggle_rsvp(pool, event.id, attendees[*index].id).await?;
        }

        tracing::debug!(event_id = event.id, title = %event.title, "Seed event created");
        report.created += 1;
    }

    Ok(report)
}
