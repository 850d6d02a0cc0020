//! Cert event record model for persistence.
//!
//! Maps to the `cert_events` table and is used by CertEventRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel for an author that could not be resolved.
pub const UNKNOWN_USER: &str = "unknown";

/// One recorded cert (qualifying photo message). Append-only; `event_id` is the merge key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertEvent {
    pub event_id: String,
    pub update_id: i64,
    pub chat_id: String,
    pub message_id: i64,
    pub user_id: String,
    pub user_name: String,
    pub caption: String,
    /// Telegram file id of the largest photo variant.
    pub photo_file_id: String,
    /// Business timestamp used for all windowing.
    pub telegram_date: DateTime<Utc>,
    /// Persistence time; audit only.
    pub created_at: DateTime<Utc>,
}

impl CertEvent {
    /// New time-ordered event id (UUIDv7).
    pub fn generate_id() -> String {
        Uuid::now_v7().to_string()
    }
}

/// The fields aggregation needs. `telegram_date` is `None` when the stored value is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertEventSummary {
    pub user_id: String,
    pub user_name: String,
    pub telegram_date: Option<DateTime<Utc>>,
}
