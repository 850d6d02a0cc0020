//! Managed user (roster entry) model and its merge patch.
//!
//! Maps to the `users` table and is used by UserRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FieldPatch;

/// Where a roster write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSource {
    Manual,
    TelegramMessage,
    TelegramChatMember,
}

impl UserSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserSource::Manual => "manual",
            UserSource::TelegramMessage => "telegram_message",
            UserSource::TelegramChatMember => "telegram_chat_member",
        }
    }
}

/// Stored roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ManagedUser {
    pub user_id: String,
    pub display_name: Option<String>,
    pub chat_id: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: Option<String>,
    pub is_active: bool,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deactivated_reason: Option<String>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub reactivated_at: Option<DateTime<Utc>>,
}

impl ManagedUser {
    /// Display name, or `user_<id>` when blank or missing.
    pub fn name(&self) -> String {
        normalize_name(self.display_name.as_deref().unwrap_or(""), &self.user_id)
    }
}

/// Trimmed name, or `user_<id>` when blank.
pub(crate) fn normalize_name(name: &str, user_id: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("user_{}", user_id)
    } else {
        trimmed.to_string()
    }
}

/// Merge write for one user: only non-`Unchanged` fields are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub user_id: String,
    pub display_name: FieldPatch<String>,
    pub chat_id: FieldPatch<String>,
    pub username: FieldPatch<String>,
    pub first_name: FieldPatch<String>,
    pub last_name: FieldPatch<String>,
    pub status: FieldPatch<String>,
    pub is_active: FieldPatch<bool>,
    pub source: FieldPatch<UserSource>,
    pub deactivated_reason: FieldPatch<String>,
    pub deactivated_at: FieldPatch<DateTime<Utc>>,
    pub reactivated_at: FieldPatch<DateTime<Utc>>,
}

impl UserPatch {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Marks the user inactive (`left`), recording why and when; clears any reactivation time.
    pub fn deactivate(user_id: impl Into<String>, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            is_active: FieldPatch::Set(false),
            status: FieldPatch::Set("left".to_string()),
            source: FieldPatch::Set(UserSource::Manual),
            deactivated_reason: FieldPatch::Set(reason.into()),
            deactivated_at: FieldPatch::Set(now),
            reactivated_at: FieldPatch::Clear,
            ..Self::new(user_id)
        }
    }

    /// Marks the user active (`member`) again; clears the deactivation fields.
    pub fn reactivate(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            is_active: FieldPatch::Set(true),
            status: FieldPatch::Set("member".to_string()),
            source: FieldPatch::Set(UserSource::Manual),
            deactivated_reason: FieldPatch::Clear,
            deactivated_at: FieldPatch::Clear,
            reactivated_at: FieldPatch::Set(now),
            ..Self::new(user_id)
        }
    }
}
