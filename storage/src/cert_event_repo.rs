//! Cert event repository: idempotent writes and window queries.
//!
//! `telegram_date` is stored as epoch milliseconds so range filters compare integers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::models::{CertEvent, CertEventSummary, UNKNOWN_USER};
use crate::repository::CertEventStore;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(sqlx::FromRow)]
struct CertEventRow {
    event_id: String,
    update_id: i64,
    chat_id: String,
    message_id: i64,
    user_id: String,
    user_name: String,
    caption: String,
    photo_file_id: String,
    telegram_date: Option<i64>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    user_id: Option<String>,
    user_name: Option<String>,
    telegram_date: Option<i64>,
}

impl From<SummaryRow> for CertEventSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            user_id: row.user_id.unwrap_or_else(|| UNKNOWN_USER.to_string()),
            user_name: row.user_name.unwrap_or_else(|| UNKNOWN_USER.to_string()),
            telegram_date: row.telegram_date.and_then(DateTime::from_timestamp_millis),
        }
    }
}

#[derive(Clone)]
pub struct CertEventRepository {
    pool_manager: SqlitePoolManager,
}

impl CertEventRepository {
    /// Opens its own pool on `database_url` and creates the table.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::with_pool(pool_manager).await
    }

    /// Uses an existing pool and creates the table.
    pub async fn with_pool(pool_manager: SqlitePoolManager) -> Result<Self> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<()> {
        info!("Creating cert_events table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cert_events (
                event_id TEXT PRIMARY KEY,
                update_id INTEGER NOT NULL,
                chat_id TEXT NOT NULL,
                message_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                caption TEXT NOT NULL DEFAULT '',
                photo_file_id TEXT NOT NULL,
                telegram_date INTEGER,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_cert_events_telegram_date ON cert_events(telegram_date);
            CREATE INDEX IF NOT EXISTS idx_cert_events_user_id ON cert_events(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Loads one event by id.
    pub async fn get_event(&self, event_id: &str) -> Result<Option<CertEvent>> {
        let row = sqlx::query_as::<_, CertEventRow>("SELECT * FROM cert_events WHERE event_id = ?")
            .bind(event_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;

        row.map(|row| {
            let telegram_date = row
                .telegram_date
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| {
                    StorageError::InvalidData(format!("cert event {} has no telegram_date", row.event_id))
                })?;
            Ok(CertEvent {
                event_id: row.event_id,
                update_id: row.update_id,
                chat_id: row.chat_id,
                message_id: row.message_id,
                user_id: row.user_id,
                user_name: row.user_name,
                caption: row.caption,
                photo_file_id: row.photo_file_id,
                telegram_date,
                created_at: row.created_at,
            })
        })
        .transpose()
    }

    pub async fn count_events(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cert_events")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CertEventStore for CertEventRepository {
    async fn insert_or_merge_event(&self, event: &CertEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cert_events (event_id, update_id, chat_id, message_id, user_id, user_name, caption, photo_file_id, telegram_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_id) DO UPDATE SET
                update_id = excluded.update_id,
                chat_id = excluded.chat_id,
                message_id = excluded.message_id,
                user_id = excluded.user_id,
                user_name = excluded.user_name,
                caption = excluded.caption,
                photo_file_id = excluded.photo_file_id,
                telegram_date = excluded.telegram_date,
                created_at = excluded.created_at
            "#,
        )
        .bind(&event.event_id)
        .bind(event.update_id)
        .bind(&event.chat_id)
        .bind(event.message_id)
        .bind(&event.user_id)
        .bind(&event.user_name)
        .bind(&event.caption)
        .bind(&event.photo_file_id)
        .bind(event.telegram_date.timestamp_millis())
        .bind(event.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(event_id = %event.event_id, user_id = %event.user_id, "Saved cert event");
        Ok(())
    }

    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CertEventSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT user_id, user_name, telegram_date FROM cert_events WHERE telegram_date >= ? AND telegram_date < ?",
        )
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(self.pool_manager.pool())
        .await?;

        info!(
            start = %start,
            end = %end,
            count = rows.len(),
            "Queried cert events"
        );
        Ok(rows.into_iter().map(CertEventSummary::from).collect())
    }

    async fn query_recent_events(&self, limit: i64) -> Result<Vec<CertEventSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT user_id, user_name, telegram_date FROM cert_events ORDER BY telegram_date DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool_manager.pool())
        .await?;

        Ok(rows.into_iter().map(CertEventSummary::from).collect())
    }
}
