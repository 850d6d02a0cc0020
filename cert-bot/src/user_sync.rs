//! Roster sync from inbound updates.
//!
//! The author of a message-like payload from the configured chat is upserted as a member,
//! then refreshed from a live membership lookup when a [`ChatDirectory`] is available. A
//! chat-member change from the configured chat upserts its subject with the new status.
//! Anything skipped is reported as a [`SkipReason`]; only storage errors fail the sync.

use cert_core::{chat_id, ChatDirectory, ChatMember, MessageSource, Result, Update, User};
use serde::Serialize;
use storage::{FieldPatch, UserPatch, UserSource, UserStore};
use tracing::debug;

use crate::storage_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MessageChatIdMismatch,
    MessageFromMissing,
    MessageMemberRefreshUnavailable,
    ChatMemberChatIdMismatch,
    UnsupportedUpdateType,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MessageChatIdMismatch => "message_chat_id_mismatch",
            SkipReason::MessageFromMissing => "message_from_missing",
            SkipReason::MessageMemberRefreshUnavailable => "message_member_refresh_unavailable",
            SkipReason::ChatMemberChatIdMismatch => "chat_member_chat_id_mismatch",
            SkipReason::UnsupportedUpdateType => "unsupported_update_type",
        }
    }
}

/// What one sync did, for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSyncResult {
    pub upsert_count: u32,
    pub message_source: MessageSource,
    pub configured_chat_id: String,
    pub incoming_message_chat_id: Option<String>,
    pub incoming_chat_member_chat_id: Option<String>,
    pub message_present: bool,
    pub message_chat_matched: bool,
    pub message_has_from: bool,
    pub chat_member_present: bool,
    pub chat_member_chat_matched: bool,
    pub skipped_reasons: Vec<SkipReason>,
}

impl UserSyncResult {
    pub fn skipped_reason_names(&self) -> Vec<&'static str> {
        self.skipped_reasons.iter().map(SkipReason::as_str).collect()
    }
}

/// Roster patch for a Telegram user seen in `chat_id`.
pub fn telegram_user_patch(
    chat_id: &str,
    user: &User,
    source: UserSource,
    status: &str,
    is_active: bool,
) -> UserPatch {
    UserPatch {
        display_name: FieldPatch::Set(user.display_name()),
        chat_id: FieldPatch::Set(chat_id.to_string()),
        username: FieldPatch::set_if_some(user.username.clone()),
        first_name: FieldPatch::set_or_clear(user.first_name.clone()),
        last_name: FieldPatch::set_or_clear(user.last_name.clone()),
        status: FieldPatch::Set(status.to_string()),
        is_active: FieldPatch::Set(is_active),
        source: FieldPatch::Set(source),
        ..UserPatch::new(user.id.to_string())
    }
}

fn member_patch(chat_id: &str, member: &ChatMember, source: UserSource) -> UserPatch {
    telegram_user_patch(chat_id, &member.user, source, &member.status, member.is_active())
}

pub async fn sync_managed_user_from_update(
    update: &Update,
    configured_chat_id: &str,
    users: &dyn UserStore,
    directory: Option<&dyn ChatDirectory>,
) -> Result<UserSyncResult> {
    let mut result = UserSyncResult {
        upsert_count: 0,
        message_source: MessageSource::None,
        configured_chat_id: configured_chat_id.to_string(),
        incoming_message_chat_id: None,
        incoming_chat_member_chat_id: None,
        message_present: false,
        message_chat_matched: false,
        message_has_from: false,
        chat_member_present: false,
        chat_member_chat_matched: false,
        skipped_reasons: Vec::new(),
    };

    let (message, source) = update.message_like();
    result.message_source = source;

    if let Some(message) = message {
        let incoming = message.chat.id.to_string();
        result.message_present = true;
        result.message_chat_matched = chat_id::matches(&incoming, configured_chat_id);
        result.message_has_from = message.from.is_some();
        result.incoming_message_chat_id = Some(incoming.clone());

        match &message.from {
            None => result.skipped_reasons.push(SkipReason::MessageFromMissing),
            Some(_) if !result.message_chat_matched => {
                result.skipped_reasons.push(SkipReason::MessageChatIdMismatch)
            }
            Some(from) => {
                let patch = telegram_user_patch(
                    &incoming,
                    from,
                    UserSource::TelegramMessage,
                    "member",
                    true,
                );
                users.upsert_user(&patch).await.map_err(storage_error)?;
                result.upsert_count += 1;

                let refreshed = match directory {
                    Some(directory) => directory.get_member(&incoming, from.id).await,
                    None => None,
                };
                match refreshed {
                    Some(member) => {
                        let patch = member_patch(&incoming, &member, UserSource::TelegramMessage);
                        users.upsert_user(&patch).await.map_err(storage_error)?;
                        result.upsert_count += 1;
                    }
                    None => {
                        debug!(user_id = from.id, "Member refresh unavailable");
                        result
                            .skipped_reasons
                            .push(SkipReason::MessageMemberRefreshUnavailable);
                    }
                }
            }
        }
    }

    if let Some(change) = &update.chat_member {
        let incoming = change.chat.id.to_string();
        result.chat_member_present = true;
        result.chat_member_chat_matched = chat_id::matches(&incoming, configured_chat_id);
        result.incoming_chat_member_chat_id = Some(incoming.clone());

        if result.chat_member_chat_matched {
            let patch = member_patch(
                &incoming,
                &change.new_chat_member,
                UserSource::TelegramChatMember,
            );
            users.upsert_user(&patch).await.map_err(storage_error)?;
            result.upsert_count += 1;
        } else {
            result.skipped_reasons.push(SkipReason::ChatMemberChatIdMismatch);
        }
    }

    if !result.message_present && !result.chat_member_present {
        result.skipped_reasons.push(SkipReason::UnsupportedUpdateType);
    }

    Ok(result)
}
