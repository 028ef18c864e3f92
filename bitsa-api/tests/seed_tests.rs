//! Integration tests for the demo seed
//!
//! Require PostgreSQL at `DATABASE_URL`; skipped when it is unset.

mod common;

use bitsa_api::seed::{seed_events, ATTENDEES};
use bitsa_shared::models::event::Event;
use bitsa_shared::models::user::User;
use common::TestContext;

#[tokio::test]
async fn test_seed_is_idempotent_and_populates_events() {
    let Some(ctx) = TestContext::try_new().await else { return };

    let first = seed_events(&ctx.db).await.expect("first seed");
    assert_eq!(first.created + first.skipped, 5);

    let second = seed_events(&ctx.db).await.expect("second seed");
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 5);

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM events WHERE title LIKE 'Sample Event _'")
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(count, 5);

    // Accounts and attendance from the plan

    let attendee = User::find_by_username(&ctx.db, ATTENDEES[0])
        .await
        .unwrap()
        .expect("seed attendee exists");
    assert!(!attendee.is_staff);

    let (private_id, is_public): (i64, bool) =
        sqlx::query_as("SELECT id, is_public FROM events WHERE title = 'Sample Event 3'")
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert!(!is_public);

    let event = Event::find_by_id(&ctx.db, private_id).await.unwrap().unwrap();
    assert!(event.end_time.is_some());
    assert!(Event::is_attending(&ctx.db, private_id, attendee.id).await.unwrap());
}
