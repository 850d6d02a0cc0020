//! Folds raw cert events into per-user weekly counts: one count per user per cert day, named
//! after the user's latest event in the window.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use cert_core::{CertCalendar, Result};
use storage::{CertEventStore, CertEventSummary};
use tracing::debug;

use crate::storage_error;

/// Deduplicated cert-day count for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyCount {
    pub user_id: String,
    /// Name on the user's latest event in the window.
    pub user_name: String,
    pub count: u32,
}

struct Tally {
    latest: DateTime<Utc>,
    user_name: String,
    days: BTreeSet<String>,
}

/// Counts distinct cert days per user for events with `start <= telegram_date < end`.
/// Events without a `telegram_date` are ignored.
pub fn aggregate(
    events: &[CertEventSummary],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    calendar: &CertCalendar,
) -> HashMap<String, WeeklyCount> {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for event in events {
        let Some(date) = event.telegram_date else {
            continue;
        };
        if date < start || date >= end {
            continue;
        }

        let day = calendar.cert_day_key(date);
        let tally = tallies.entry(event.user_id.as_str()).or_insert_with(|| Tally {
            latest: date,
            user_name: event.user_name.clone(),
            days: BTreeSet::new(),
        });
        if date > tally.latest {
            tally.latest = date;
            tally.user_name = event.user_name.clone();
        }
        tally.days.insert(day);
    }

    tallies
        .into_iter()
        .map(|(user_id, tally)| {
            (
                user_id.to_string(),
                WeeklyCount {
                    user_id: user_id.to_string(),
                    user_name: tally.user_name,
                    count: tally.days.len() as u32,
                },
            )
        })
        .collect()
}

/// Queries `[start, end)` from the store and aggregates it.
pub async fn count_by_user_between(
    store: &dyn CertEventStore,
    calendar: &CertCalendar,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<HashMap<String, WeeklyCount>> {
    let events = store.query_events(start, end).await.map_err(storage_error)?;
    let counts = aggregate(&events, start, end, calendar);
    debug!(
        events = events.len(),
        users = counts.len(),
        "Aggregated cert events"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn event(user_id: &str, name: &str, date: Option<&str>) -> CertEventSummary {
        CertEventSummary {
            user_id: user_id.to_string(),
            user_name: name.to_string(),
            telegram_date: date.map(at),
        }
    }

    fn week() -> (DateTime<Utc>, DateTime<Utc>) {
        (at("2024-06-03T02:01:00+09:00"), at("2024-06-10T02:01:00+09:00"))
    }

    #[test]
    fn test_counts_distinct_cert_days_not_events() {
        let (start, end) = week();
        let events = vec![
            event("1", "Ann", Some("2024-06-04T09:00:00+09:00")),
            event("1", "Ann", Some("2024-06-04T13:00:00+09:00")),
            // 01:30 on the 5th still belongs to the 4th
            event("1", "Ann", Some("2024-06-05T01:30:00+09:00")),
            event("1", "Ann", Some("2024-06-06T08:00:00+09:00")),
            event("1", "Ann", Some("2024-06-06T22:00:00+09:00")),
        ];

        let counts = aggregate(&events, start, end, &CertCalendar::default());
        assert_eq!(counts["1"].count, 2);
    }

    #[test]
    fn test_latest_event_names_the_user() {
        let (start, end) = week();
        let events = vec![
            event("1", "New Name", Some("2024-06-07T10:00:00+09:00")),
            event("1", "Old Name", Some("2024-06-04T10:00:00+09:00")),
        ];

        let counts = aggregate(&events, start, end, &CertCalendar::default());
        assert_eq!(counts["1"].user_name, "New Name");
        assert_eq!(counts["1"].count, 2);
    }

    #[test]
    fn test_skips_missing_dates_and_out_of_range() {
        let (start, end) = week();
        let events = vec![
            event("1", "Ann", None),
            event("2", "Bo", Some("2024-06-03T02:00:00+09:00")),
            event("2", "Bo", Some("2024-06-10T02:01:00+09:00")),
            event("3", "Cy", Some("2024-06-03T02:01:00+09:00")),
        ];

        let counts = aggregate(&events, start, end, &CertCalendar::default());
        assert!(!counts.contains_key("1"));
        assert!(!counts.contains_key("2"));
        assert_eq!(counts["3"].count, 1);
    }

    #[test]
    fn test_missing_date_does_not_rename() {
        let (start, end) = week();
        let events = vec![
            event("1", "Ann", Some("2024-06-04T10:00:00+09:00")),
            event("1", "Ghost", None),
        ];

        let counts = aggregate(&events, start, end, &CertCalendar::default());
        assert_eq!(counts["1"].user_name, "Ann");
        assert_eq!(counts["1"].count, 1);
    }
}
