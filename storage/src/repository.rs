//! Store traits the application depends on; SQLite repositories implement them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CertEvent, CertEventSummary, ManagedUser, UserPatch};

/// Append/query access to cert events.
#[async_trait]
pub trait CertEventStore: Send + Sync {
    /// Writes the event; a second write with the same `event_id` merges into the first.
    async fn insert_or_merge_event(&self, event: &CertEvent) -> Result<()>;
    /// Events with `start <= telegram_date < end`.
    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CertEventSummary>>;
    /// Latest `limit` events by `telegram_date`, newest first.
    async fn query_recent_events(&self, limit: i64) -> Result<Vec<CertEventSummary>>;
}

/// Roster access.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the row when missing, then applies the patch field by field.
    async fn upsert_user(&self, patch: &UserPatch) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<ManagedUser>>;
    /// Active users whose chat id is one of `chat_ids` (all active users when empty), sorted by name.
    async fn list_active_users(&self, chat_ids: &[String]) -> Result<Vec<ManagedUser>>;
}
