//! Inbound update types as delivered by the Telegram webhook, reduced to the fields the bot reads.
//!
//! Decoded with serde from the webhook body; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Telegram user (message author or chat member subject).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    /// `"first last"` from the non-empty name parts, or `None` when both are missing/empty.
    pub fn full_name(&self) -> Option<String> {
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Roster display name: full name, else username, else `user_<id>`.
    pub fn display_name(&self) -> String {
        self.full_name()
            .or_else(|| self.username.clone().filter(|u| !u.is_empty()))
            .unwrap_or_else(|| format!("user_{}", self.id))
    }
}

/// Chat identity. `chat_type` is one of `private`, `group`, `supergroup`, `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        matches!(self.chat_type.as_str(), "group" | "supergroup")
    }
}

/// One size variant of a photo. Telegram lists variants smallest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Message, edited message or channel post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Epoch seconds.
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
    pub fn has_photo(&self) -> bool {
        self.photo.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Largest photo variant: the last element, per Telegram's ascending-size ordering.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.as_ref().and_then(|p| p.last())
    }
}

/// Membership record of one user in a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user: User,
    /// `creator`, `administrator`, `member`, `restricted`, `left` or `kicked`.
    pub status: String,
    #[serde(default)]
    pub is_member: Option<bool>,
}

impl ChatMember {
    /// Whether the member counts as present in the chat.
    pub fn is_active(&self) -> bool {
        match self.status.as_str() {
            "creator" | "administrator" | "member" => true,
            "restricted" => self.is_member.unwrap_or(false),
            _ => false,
        }
    }
}

/// Membership change of a chat member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

/// One webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub edited_message: Option<Message>,
    #[serde(default)]
    pub channel_post: Option<Message>,
    #[serde(default)]
    pub edited_channel_post: Option<Message>,
    #[serde(default)]
    pub chat_member: Option<ChatMemberUpdated>,
}

/// Which slot of an [`Update`] carried the message-like payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    None,
}

impl MessageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageSource::Message => "message",
            MessageSource::EditedMessage => "edited_message",
            MessageSource::ChannelPost => "channel_post",
            MessageSource::EditedChannelPost => "edited_channel_post",
            MessageSource::None => "none",
        }
    }
}

impl Update {
    /// First message-like payload in priority order: message, edited message, channel post, edited channel post.
    pub fn message_like(&self) -> (Option<&Message>, MessageSource) {
        if let Some(m) = &self.message {
            return (Some(m), MessageSource::Message);
        }
        if let Some(m) = &self.edited_message {
            return (Some(m), MessageSource::EditedMessage);
        }
        if let Some(m) = &self.channel_post {
            return (Some(m), MessageSource::ChannelPost);
        }
        if let Some(m) = &self.edited_channel_post {
            return (Some(m), MessageSource::EditedChannelPost);
        }
        (None, MessageSource::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>, username: Option<&str>) -> User {
        User {
            id: 7,
            username: username.map(String::from),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        }
    }

    #[test]
    fn test_full_name_joins_parts() {
        assert_eq!(
            user(Some("Kim"), Some("Minji"), None).full_name().as_deref(),
            Some("Kim Minji")
        );
        assert_eq!(user(Some("Kim"), None, None).full_name().as_deref(), Some("Kim"));
        assert_eq!(user(None, None, Some("mj")).full_name(), None);
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(user(None, None, Some("mj")).display_name(), "mj");
        assert_eq!(user(None, None, None).display_name(), "user_7");
    }

    #[test]
    fn test_decode_photo_update() {
        let body = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "date": 1717340000,
                "chat": {"id": -1001234567890, "type": "supergroup", "title": "reading"},
                "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
                "caption": "day 3",
                "photo": [
                    {"file_id": "small", "file_unique_id": "a", "width": 90, "height": 90},
                    {"file_id": "large", "file_unique_id": "b", "width": 1280, "height": 1280}
                ]
            }
        }"#;
        let update: Update = serde_json::from_str(body).unwrap();
        let (message, source) = update.message_like();
        let message = message.unwrap();
        assert_eq!(source, MessageSource::Message);
        assert!(message.chat.is_group());
        assert_eq!(message.largest_photo().unwrap().file_id, "large");
    }

    #[test]
    fn test_message_like_priority() {
        let msg = Message {
            message_id: 1,
            date: 0,
            chat: Chat {
                id: -1,
                chat_type: "channel".to_string(),
                title: None,
            },
            from: None,
            caption: None,
            photo: None,
        };
        let update = Update {
            update_id: 1,
            channel_post: Some(msg.clone()),
            edited_channel_post: Some(msg),
            ..Default::default()
        };
        assert_eq!(update.message_like().1, MessageSource::ChannelPost);
        assert_eq!(Update::default().message_like().1, MessageSource::None);
    }

    #[test]
    fn test_member_activity() {
        let mut member = ChatMember {
            user: user(None, None, None),
            status: "restricted".to_string(),
            is_member: None,
        };
        assert!(!member.is_active());
        member.is_member = Some(true);
        assert!(member.is_active());
        member.status = "kicked".to_string();
        assert!(!member.is_active());
        member.status = "creator".to_string();
        assert!(member.is_active());
    }
}
