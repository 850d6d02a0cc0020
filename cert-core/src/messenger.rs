//! Outbound messaging and membership lookup.
//!
//! [`Messenger`] and [`ChatDirectory`] are transport-agnostic; [`TelegramClient`] implements both via teloxide.
//! [`send_with_migration`] is the only retry policy: one resend to the chat id a failed send reports
//! the group migrated to.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ChatMemberKind, ChatMemberStatus, Recipient, UserId};
use teloxide::RequestError;
use tracing::{info, warn};

use crate::error::{CertError, Result};
use crate::types::{ChatMember, User};

/// Failed send, optionally carrying the id the chat migrated to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub description: String,
    pub migrate_to_chat_id: Option<String>,
}

impl SendFailure {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            migrate_to_chat_id: None,
        }
    }

    pub fn migrated(description: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            migrate_to_chat_id: Some(chat_id.into()),
        }
    }
}

/// Sends plain text to a chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> std::result::Result<(), SendFailure>;
}

/// Looks up chat membership.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Current membership of `user_id`, or `None` when the lookup is unavailable.
    async fn get_member(&self, chat_id: &str, user_id: i64) -> Option<ChatMember>;
    /// Administrators of the chat, following a migration hint once.
    async fn list_administrators(&self, chat_id: &str) -> Result<Vec<ChatMember>>;
}

/// Sends `text`, retrying exactly once against the migrated chat id when the first send reports one.
pub async fn send_with_migration(
    messenger: &dyn Messenger,
    chat_id: &str,
    text: &str,
) -> Result<()> {
    let failure = match messenger.send_text(chat_id, text).await {
        Ok(()) => return Ok(()),
        Err(failure) => failure,
    };

    let Some(migrated) = failure.migrate_to_chat_id else {
        return Err(CertError::Telegram(format!(
            "sendMessage failed: {}",
            failure.description
        )));
    };

    warn!(
        chat_id = %chat_id,
        migrate_to_chat_id = %migrated,
        "Chat migrated, retrying send"
    );

    messenger.send_text(&migrated, text).await.map_err(|retry| {
        CertError::Telegram(format!(
            "sendMessage failed after migration to {}: {}",
            migrated, retry.description
        ))
    })
}

/// Numeric ids go out as ids, anything else as a channel username.
fn recipient(chat_id: &str) -> Recipient {
    let trimmed = chat_id.trim();
    match trimmed.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(trimmed.to_string()),
    }
}

fn user_from_telegram(user: &teloxide::types::User) -> User {
    User {
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

fn member_from_telegram(member: &teloxide::types::ChatMember) -> ChatMember {
    let status = match member.kind.status() {
        ChatMemberStatus::Owner => "creator",
        ChatMemberStatus::Administrator => "administrator",
        ChatMemberStatus::Member => "member",
        ChatMemberStatus::Restricted => "restricted",
        ChatMemberStatus::Left => "left",
        ChatMemberStatus::Banned => "kicked",
    };
    let is_member = match &member.kind {
        ChatMemberKind::Restricted(restricted) => Some(restricted.is_member),
        _ => None,
    };
    ChatMember {
        user: user_from_telegram(&member.user),
        status: status.to_string(),
        is_member,
    }
}

/// Teloxide-based implementation of [`Messenger`] and [`ChatDirectory`].
#[derive(Clone)]
pub struct TelegramClient {
    bot: teloxide::Bot,
}

impl TelegramClient {
    /// Creates a client for the given bot token against the public Bot API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: teloxide::Bot::new(token.into()),
        }
    }

    /// Creates a client, pointing it at `api_url` when given (self-hosted Bot API or tests).
    pub fn with_api_url(token: impl Into<String>, api_url: Option<&str>) -> Result<Self> {
        let mut bot = teloxide::Bot::new(token.into());
        if let Some(url) = api_url {
            let url = reqwest::Url::parse(url)
                .map_err(|e| CertError::Config(format!("Invalid Telegram API URL {}: {}", url, e)))?;
            bot = bot.set_api_url(url);
        }
        Ok(Self { bot })
    }

    /// Returns the underlying teloxide::Bot for direct API use when needed.
    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: &str, text: &str) -> std::result::Result<(), SendFailure> {
        match self.bot.send_message(recipient(chat_id), text).await {
            Ok(sent) => {
                info!(chat_id = %chat_id, message_id = sent.id.0, "Message sent");
                Ok(())
            }
            Err(RequestError::MigrateToChatId(new_id)) => Err(SendFailure::migrated(
                format!("chat {} migrated to {}", chat_id, new_id.0),
                new_id.0.to_string(),
            )),
            Err(e) => Err(SendFailure::new(e.to_string())),
        }
    }
}

#[async_trait]
impl ChatDirectory for TelegramClient {
    async fn get_member(&self, chat_id: &str, user_id: i64) -> Option<ChatMember> {
        let Ok(uid) = u64::try_from(user_id) else {
            warn!(chat_id = %chat_id, user_id, "getChatMember skipped for non-user id");
            return None;
        };
        match self.bot.get_chat_member(recipient(chat_id), UserId(uid)).await {
            Ok(member) => Some(member_from_telegram(&member)),
            Err(e) => {
                warn!(
                    chat_id = %chat_id,
                    user_id,
                    error = %e,
                    "getChatMember failed"
                );
                None
            }
        }
    }

    async fn list_administrators(&self, chat_id: &str) -> Result<Vec<ChatMember>> {
        let admins = match self.bot.get_chat_administrators(recipient(chat_id)).await {
            Ok(admins) => admins,
            Err(RequestError::MigrateToChatId(new_id)) if new_id.0.to_string() != chat_id.trim() => {
                warn!(
                    chat_id = %chat_id,
                    migrate_to_chat_id = new_id.0,
                    "Chat migrated, retrying getChatAdministrators"
                );
                self.bot
                    .get_chat_administrators(Recipient::Id(new_id))
                    .await
                    .map_err(|e| {
                        CertError::Telegram(format!("getChatAdministrators failed: {}", e))
                    })?
            }
            Err(e) => {
                return Err(CertError::Telegram(format!(
                    "getChatAdministrators failed: {}",
                    e
                )))
            }
        };
        Ok(admins.iter().map(member_from_telegram).collect())
    }
}
