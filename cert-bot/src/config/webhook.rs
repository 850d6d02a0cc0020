//! Webhook config: the single group chat, optional shared secret and caption filter.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use super::{optional_env, required_env};

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// TELEGRAM_GROUP_CHAT_ID
    pub group_chat_id: String,
    /// TELEGRAM_BOT_TOKEN: enables live membership refresh during user sync
    pub bot_token: Option<String>,
    /// TELEGRAM_WEBHOOK_SECRET_TOKEN
    pub webhook_secret_token: Option<String>,
    /// CERT_CAPTION_REGEX, compiled case-insensitive
    pub caption_regex: Option<Regex>,
    /// WEBHOOK_BIND_ADDR
    pub bind_addr: String,
}

impl WebhookConfig {
    pub fn load() -> Result<Self> {
        let group_chat_id = required_env("TELEGRAM_GROUP_CHAT_ID")?;
        let caption_regex = optional_env("CERT_CAPTION_REGEX")
            .map(|pattern| build_caption_regex(&pattern))
            .transpose()?;

        Ok(Self {
            group_chat_id,
            bot_token: optional_env("TELEGRAM_BOT_TOKEN"),
            webhook_secret_token: optional_env("TELEGRAM_WEBHOOK_SECRET_TOKEN"),
            caption_regex,
            bind_addr: optional_env("WEBHOOK_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        })
    }

    /// Config for a chat with no secret, caption filter or bot token.
    pub fn for_chat(group_chat_id: impl Into<String>) -> Self {
        Self {
            group_chat_id: group_chat_id.into(),
            bot_token: None,
            webhook_secret_token: None,
            caption_regex: None,
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

pub fn build_caption_regex(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("Invalid CERT_CAPTION_REGEX: {}", pattern))
}
