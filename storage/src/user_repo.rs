//! Managed user repository: merge writes keyed by user id.
//!
//! A write inserts a bare row when the user is new, then applies only the patch fields that
//! are not [`FieldPatch::Unchanged`]; `Clear` writes NULL.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Encode, QueryBuilder, Sqlite, Type};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{normalize_name, FieldPatch, ManagedUser, UserPatch};
use crate::repository::UserStore;
use crate::sqlite_pool::SqlitePoolManager;

/// Appends `, column = ?` for a changed field.
fn push_patch<'args, T>(qb: &mut QueryBuilder<'args, Sqlite>, column: &str, patch: &FieldPatch<T>)
where
    T: Clone + Send + 'args + Encode<'args, Sqlite> + Type<Sqlite>,
{
    match patch {
        FieldPatch::Unchanged => {}
        FieldPatch::Set(value) => {
            qb.push(format!(", {} = ", column));
            qb.push_bind(value.clone());
        }
        FieldPatch::Clear => {
            qb.push(format!(", {} = ", column));
            qb.push_bind(None::<T>);
        }
    }
}

#[derive(Clone)]
pub struct UserRepository {
    pool_manager: SqlitePoolManager,
}

impl UserRepository {
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
        info!("Creating users table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                display_name TEXT,
                chat_id TEXT,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                status TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                source TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deactivated_reason TEXT,
                deactivated_at TEXT,
                reactivated_at TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_active_chat ON users(is_active, chat_id)")
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn upsert_user(&self, patch: &UserPatch) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool_manager.pool().begin().await?;

        sqlx::query(
            "INSERT INTO users (user_id, created_at, updated_at) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(&patch.user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let display_name = patch
            .display_name
            .clone()
            .map(|name| normalize_name(&name, &patch.user_id));
        let source = patch.source.clone().map(|s| s.as_str().to_string());

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        qb.push_bind(now);
        push_patch(&mut qb, "display_name", &display_name);
        push_patch(&mut qb, "chat_id", &patch.chat_id);
        push_patch(&mut qb, "username", &patch.username);
        push_patch(&mut qb, "first_name", &patch.first_name);
        push_patch(&mut qb, "last_name", &patch.last_name);
        push_patch(&mut qb, "status", &patch.status);
        push_patch(&mut qb, "is_active", &patch.is_active);
        push_patch(&mut qb, "source", &source);
        push_patch(&mut qb, "deactivated_reason", &patch.deactivated_reason);
        push_patch(&mut qb, "deactivated_at", &patch.deactivated_at);
        push_patch(&mut qb, "reactivated_at", &patch.reactivated_at);
        qb.push(" WHERE user_id = ");
        qb.push_bind(patch.user_id.clone());

        qb.build().execute(&mut *tx).await?;
        tx.commit().await?;

        debug!(user_id = %patch.user_id, "Upserted managed user");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<ManagedUser>> {
        let user = sqlx::query_as::<_, ManagedUser>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(user)
    }

    async fn list_active_users(&self, chat_ids: &[String]) -> Result<Vec<ManagedUser>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE is_active = 1");
        if !chat_ids.is_empty() {
            qb.push(" AND chat_id IN (");
            let mut separated = qb.separated(", ");
            for chat_id in chat_ids {
                separated.push_bind(chat_id.clone());
            }
            separated.push_unseparated(")");
        }

        let mut users: Vec<ManagedUser> = qb
            .build_query_as::<ManagedUser>()
            .fetch_all(self.pool_manager.pool())
            .await?;
        users.sort_by(|a, b| a.name().cmp(&b.name()));

        info!(count = users.len(), "Listed active managed users");
        Ok(users)
    }
}
