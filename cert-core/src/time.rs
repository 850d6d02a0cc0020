//! Cert-day and weekly window computation.
//!
//! A cert day runs from 02:01 local time to 02:01 the next day. A week runs from Monday 02:01
//! local time to the following Monday 02:01, half-open. All arithmetic happens on local
//! wall-clock values of the configured zone, so DST transitions shift the UTC length of a week
//! but never its local boundaries.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CertError, Result};

/// Zone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

const DAILY_CUTOFF_HOUR: i64 = 2;
const NEXT_WINDOW_START_MINUTE: i64 = 1;
const LABEL_FORMAT: &str = "%m-%d %H:%M";

fn cutoff_offset() -> Duration {
    Duration::hours(DAILY_CUTOFF_HOUR) + Duration::minutes(NEXT_WINDOW_START_MINUTE)
}

/// Half-open `[start, end)` accounting week with display labels in the local zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_label: String,
    /// Label of `end - 1 minute`, so the printed range stays inside the week.
    pub end_label: String,
}

impl WeekRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Cert-day and week boundaries for one named time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertCalendar {
    tz: Tz,
}

impl Default for CertCalendar {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl CertCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Builds a calendar from an IANA zone name such as `Asia/Seoul`.
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .trim()
            .parse()
            .map_err(|e| CertError::Config(format!("Invalid timezone '{}': {}", name, e)))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// `YYYY-MM-DD` of the cert day containing `instant`.
    pub fn cert_day_key(&self, instant: DateTime<Utc>) -> String {
        let local = instant.with_timezone(&self.tz).naive_local();
        (local - cutoff_offset()).format("%Y-%m-%d").to_string()
    }

    /// Start of the accounting week containing `now`.
    pub fn current_week_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.cutoff_instant(self.week_monday(now))
    }

    pub fn current_week_range(&self, now: DateTime<Utc>) -> WeekRange {
        self.range_from_monday(self.week_monday(now))
    }

    /// The week before [`current_week_range`](Self::current_week_range); its end is the current week's start.
    pub fn last_week_range(&self, now: DateTime<Utc>) -> WeekRange {
        self.range_from_monday(self.week_monday(now) - Duration::days(7))
    }

    pub fn label(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format(LABEL_FORMAT).to_string()
    }

    /// Monday (local date) of the accounting week containing `now`.
    fn week_monday(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = now.with_timezone(&self.tz);
        let monday = local.date_naive()
            - Duration::days(i64::from(local.weekday().num_days_from_monday()));
        if now < self.cutoff_instant(monday) {
            monday - Duration::days(7)
        } else {
            monday
        }
    }

    fn range_from_monday(&self, monday: NaiveDate) -> WeekRange {
        let start = self.cutoff_instant(monday);
        let end = self.cutoff_instant(monday + Duration::days(7));
        WeekRange {
            start,
            end,
            start_label: self.label(start),
            end_label: self.label(end - Duration::minutes(1)),
        }
    }

    /// 02:01 local time on `date`.
    fn cutoff_instant(&self, date: NaiveDate) -> DateTime<Utc> {
        resolve_local(&self.tz, date.and_time(NaiveTime::default()) + cutoff_offset())
    }
}

/// Maps a local wall-clock value to an instant. Ambiguous values take the earlier instant;
/// values inside a DST gap move forward to the first valid local time.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = naive;
    loop {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(t) => return t.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
}

/// [`CertCalendar::cert_day_key`] in the default zone.
pub fn cert_day_key(instant: DateTime<Utc>) -> String {
    CertCalendar::default().cert_day_key(instant)
}

/// Current week in the default zone, relative to the system clock.
pub fn current_week_range() -> WeekRange {
    CertCalendar::default().current_week_range(Utc::now())
}

/// Last week in the default zone, relative to the system clock.
pub fn last_week_range() -> WeekRange {
    CertCalendar::default().last_week_range(Utc::now())
}
