//! Scheduled reports and roster maintenance commands.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use cert_core::{chat_id, send_with_migration, CertCalendar, ChatDirectory, Messenger};
use chrono::{DateTime, Utc};
use storage::{CertEventStore, FieldPatch, UserPatch, UserSource, UserStore, UNKNOWN_USER};
use tracing::info;

use crate::aggregate::count_by_user_between;
use crate::config::JobConfig;
use crate::report::{
    format_daily_status, format_weekly_settlement, rank_current_week, settlement_entries,
    FinePolicy,
};
use crate::user_sync::telegram_user_patch;

/// How many recent cert events the participant draft scans.
pub const PARTICIPANT_SCAN_LIMIT: i64 = 5000;

fn fine_policy(config: &JobConfig) -> FinePolicy {
    FinePolicy {
        weekly_target_count: config.weekly_target_count,
        fine_per_missed_cert: config.fine_per_missed_cert,
    }
}

/// Sends the current-week ranking to the group chat and returns the text sent.
pub async fn run_daily_status(
    config: &JobConfig,
    calendar: &CertCalendar,
    events: &dyn CertEventStore,
    messenger: &dyn Messenger,
    now: DateTime<Utc>,
) -> Result<String> {
    let range = calendar.current_week_range(now);
    let counts = count_by_user_between(events, calendar, range.start, range.end).await?;
    let entries = rank_current_week(&counts, &config.participants);
    let text = format_daily_status(&range, &fine_policy(config), &entries);

    send_with_migration(messenger, &config.group_chat_id, &text)
        .await
        .context("Failed to send daily status")?;
    info!(
        users = entries.len(),
        start = %range.start_label,
        end = %range.end_label,
        "Daily status sent"
    );
    Ok(text)
}

/// Sends last week's settlement to the group chat and returns the text sent.
pub async fn run_weekly_settlement(
    config: &JobConfig,
    calendar: &CertCalendar,
    events: &dyn CertEventStore,
    users: &dyn UserStore,
    messenger: &dyn Messenger,
    now: DateTime<Utc>,
) -> Result<String> {
    let range = calendar.last_week_range(now);
    let counts = count_by_user_between(events, calendar, range.start, range.end).await?;
    let chat_ids: Vec<String> = chat_id::expand_identity_forms(&config.group_chat_id)
        .into_iter()
        .collect();
    let roster = users
        .list_active_users(&chat_ids)
        .await
        .context("Failed to list active users")?;
    let entries = settlement_entries(&counts, &roster);
    let text = format_weekly_settlement(&range, &fine_policy(config), &entries);

    send_with_migration(messenger, &config.group_chat_id, &text)
        .await
        .context("Failed to send weekly settlement")?;
    info!(
        users = entries.len(),
        start = %range.start_label,
        end = %range.end_label,
        "Weekly settlement sent"
    );
    Ok(text)
}

/// Adds or updates a manual roster entry as an active member of the group chat.
pub async fn user_add(config: &JobConfig, users: &dyn UserStore, user_id: &str, name: &str) -> Result<()> {
    let patch = UserPatch {
        display_name: FieldPatch::Set(name.to_string()),
        chat_id: FieldPatch::Set(config.group_chat_id.clone()),
        status: FieldPatch::Set("member".to_string()),
        is_active: FieldPatch::Set(true),
        source: FieldPatch::Set(UserSource::Manual),
        ..UserPatch::new(user_id)
    };
    users.upsert_user(&patch).await.context("Failed to upsert user")?;
    info!(user_id = %user_id, "User added");
    Ok(())
}

/// Deactivates a roster entry.
pub async fn user_remove(users: &dyn UserStore, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    users
        .upsert_user(&UserPatch::deactivate(user_id, "manual_remove", now))
        .await
        .context("Failed to deactivate user")?;
    info!(user_id = %user_id, "User deactivated");
    Ok(())
}

/// Reactivates a roster entry.
pub async fn user_reactivate(users: &dyn UserStore, user_id: &str, now: DateTime<Utc>) -> Result<()> {
    users
        .upsert_user(&UserPatch::reactivate(user_id, now))
        .await
        .context("Failed to reactivate user")?;
    info!(user_id = %user_id, "User reactivated");
    Ok(())
}

/// Refreshes one roster entry from its live membership. Returns `(display_name, status, active)`.
pub async fn user_sync(
    config: &JobConfig,
    users: &dyn UserStore,
    directory: &dyn ChatDirectory,
    user_id: &str,
) -> Result<(String, String, bool)> {
    let numeric_id: i64 = user_id
        .trim()
        .parse()
        .with_context(|| format!("User id must be numeric: {}", user_id))?;
    let member = directory
        .get_member(&config.group_chat_id, numeric_id)
        .await
        .with_context(|| format!("Telegram getChatMember failed for user {}", user_id))?;

    let active = member.is_active();
    let patch = telegram_user_patch(
        &config.group_chat_id,
        &member.user,
        UserSource::Manual,
        &member.status,
        active,
    );
    users.upsert_user(&patch).await.context("Failed to upsert user")?;

    let name = member.user.display_name();
    info!(user_id = member.user.id, status = %member.status, active, "User synced");
    Ok((name, member.status, active))
}

/// `id:name,...` draft of the participant list: chat administrators plus recent cert authors.
/// Administrator names win; sorted by name.
pub async fn participants_draft(
    config: &JobConfig,
    events: &dyn CertEventStore,
    directory: &dyn ChatDirectory,
) -> Result<String> {
    let admins = directory
        .list_administrators(&config.group_chat_id)
        .await
        .context("Telegram getChatAdministrators failed")?;

    let mut unique: HashMap<String, String> = admins
        .iter()
        .map(|member| (member.user.id.to_string(), member.user.display_name()))
        .collect();

    let recent = events
        .query_recent_events(PARTICIPANT_SCAN_LIMIT)
        .await
        .context("Failed to query recent cert events")?;

    let mut seen = HashSet::new();
    for event in recent {
        let user_id = event.user_id.trim();
        if user_id.is_empty() || user_id == UNKNOWN_USER || event.telegram_date.is_none() {
            continue;
        }
        if !seen.insert(user_id.to_string()) || unique.contains_key(user_id) {
            continue;
        }
        let name = event.user_name.trim();
        let name = if name.is_empty() {
            format!("user_{}", user_id)
        } else {
            name.to_string()
        };
        unique.insert(user_id.to_string(), name);
    }

    let mut participants: Vec<(String, String)> = unique.into_iter().collect();
    participants.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    Ok(participants
        .into_iter()
        .map(|(id, name)| format!("{}:{}", id, name))
        .collect::<Vec<_>>()
        .join(","))
}
