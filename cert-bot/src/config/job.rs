//! Job config: bot token, group chat, weekly target, fine rate and the static participant list.

use anyhow::Result;

use super::{number_env, optional_env, required_env};

const DEFAULT_WEEKLY_TARGET_COUNT: u32 = 3;
const DEFAULT_FINE_PER_MISSED_CERT: u64 = 2000;

/// Hand-maintained participant; guarantees a row in the current-week ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct JobConfig {
    /// TELEGRAM_BOT_TOKEN
    pub bot_token: String,
    /// TELEGRAM_GROUP_CHAT_ID
    pub group_chat_id: String,
    /// FINE_PER_MISSED_CERT
    pub fine_per_missed_cert: u64,
    /// WEEKLY_TARGET_COUNT
    pub weekly_target_count: u32,
    /// PARTICIPANTS (`id:name,id:name`)
    pub participants: Vec<Participant>,
}

impl JobConfig {
    pub fn load() -> Result<Self> {
        Ok(Self {
            bot_token: required_env("TELEGRAM_BOT_TOKEN")?,
            group_chat_id: required_env("TELEGRAM_GROUP_CHAT_ID")?,
            fine_per_missed_cert: number_env("FINE_PER_MISSED_CERT", DEFAULT_FINE_PER_MISSED_CERT)?,
            weekly_target_count: number_env("WEEKLY_TARGET_COUNT", DEFAULT_WEEKLY_TARGET_COUNT)?,
            participants: parse_participants(optional_env("PARTICIPANTS").as_deref())?,
        })
    }
}

/// Parses `id:name,id:name`. Blank entries are skipped; an entry without both parts is an error.
pub fn parse_participants(raw: Option<&str>) -> Result<Vec<Participant>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|pair| {
            let mut parts = pair.split(':').map(str::trim);
            match (parts.next(), parts.next()) {
                (Some(id), Some(name)) if !id.is_empty() && !name.is_empty() => Ok(Participant {
                    id: id.to_string(),
                    name: name.to_string(),
                }),
                _ => anyhow::bail!("PARTICIPANTS must be in format 'id:name,id:name'"),
            }
        })
        .collect()
}
