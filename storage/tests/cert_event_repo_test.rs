//! Integration tests for [`storage::CertEventRepository`].
//!
//! Covers idempotent writes, half-open window queries and recent-event ordering on a temp SQLite file.

use chrono::{DateTime, Duration, TimeZone, Utc};
use storage::{CertEvent, CertEventRepository, CertEventStore};
use tempfile::TempDir;

async fn setup() -> (TempDir, CertEventRepository) {
    let dir = TempDir::new().expect("TempDir::new must succeed");
    let path = dir.path().join("cert.db");
    let repo = CertEventRepository::new(path.to_str().unwrap())
        .await
        .expect("Failed to create repository");
    (dir, repo)
}

fn event(user_id: &str, user_name: &str, telegram_date: DateTime<Utc>) -> CertEvent {
    CertEvent {
        event_id: CertEvent::generate_id(),
        update_id: 1,
        chat_id: "-1001234567890".to_string(),
        message_id: 10,
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        caption: String::new(),
        photo_file_id: "photo-large".to_string(),
        telegram_date,
        created_at: Utc::now(),
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
}

/// **Test: Writing the same event id twice merges into one row.**
///
/// **Setup:** One event; write it, change the caption, write again.
/// **Action:** `insert_or_merge_event` twice, then `get_event`.
/// **Expected:** One row; caption is the second write's.
#[tokio::test]
async fn test_insert_same_event_id_merges() {
    let (_dir, repo) = setup().await;
    let mut e = event("42", "Ann", base_time());

    repo.insert_or_merge_event(&e).await.expect("first write");
    e.caption = "edited".to_string();
    repo.insert_or_merge_event(&e).await.expect("second write");

    assert_eq!(repo.count_events().await.unwrap(), 1);
    let stored = repo.get_event(&e.event_id).await.unwrap().expect("event exists");
    assert_eq!(stored.caption, "edited");
    assert_eq!(stored.telegram_date, e.telegram_date);
    assert_eq!(stored.photo_file_id, "photo-large");
}

/// **Test: Distinct events for the same user and day are all kept.**
///
/// **Setup:** Two events, same user, one minute apart.
/// **Action:** Write both.
/// **Expected:** Two rows (dedup happens at aggregation, not at write).
#[tokio::test]
async fn test_distinct_events_same_day_are_kept() {
    let (_dir, repo) = setup().await;
    repo.insert_or_merge_event(&event("42", "Ann", base_time()))
        .await
        .unwrap();
    repo.insert_or_merge_event(&event("42", "Ann", base_time() + Duration::minutes(1)))
        .await
        .unwrap();

    assert_eq!(repo.count_events().await.unwrap(), 2);
}

/// **Test: Window query is half-open.**
///
/// **Setup:** Events at start - 1ms, start, end - 1ms and end.
/// **Action:** `query_events(start, end)`.
/// **Expected:** Only the events at start and end - 1ms are returned.
#[tokio::test]
async fn test_query_events_half_open_range() {
    let (_dir, repo) = setup().await;
    let start = base_time();
    let end = start + Duration::days(7);

    for (name, at) in [
        ("before", start - Duration::milliseconds(1)),
        ("first", start),
        ("last", end - Duration::milliseconds(1)),
        ("after", end),
    ] {
        repo.insert_or_merge_event(&event("42", name, at)).await.unwrap();
    }

    let mut names: Vec<String> = repo
        .query_events(start, end)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.user_name)
        .collect();
    names.sort();

    assert_eq!(names, vec!["first".to_string(), "last".to_string()]);
}

/// **Test: Recent events come back newest first and respect the limit.**
#[tokio::test]
async fn test_query_recent_events_order_and_limit() {
    let (_dir, repo) = setup().await;
    for i in 0..5 {
        repo.insert_or_merge_event(&event(
            &format!("{}", i),
            &format!("user{}", i),
            base_time() + Duration::hours(i),
        ))
        .await
        .unwrap();
    }

    let recent = repo.query_recent_events(3).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|s| s.user_id.as_str()).collect();
    assert_eq!(ids, vec!["4", "3", "2"]);
    assert!(recent.iter().all(|s| s.telegram_date.is_some()));
}
