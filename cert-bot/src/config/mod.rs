//! Configuration loaded from environment variables: BaseConfig (storage, logging, Telegram API,
//! time zone), WebhookConfig (ingress) and JobConfig (scheduled reports and user CLI).

mod base;
mod job;
mod webhook;


use anyhow::Result;
use std::env;
use std::str::FromStr;

pub use base::BaseConfig;
pub use job::{parse_participants, JobConfig, Participant};
pub use webhook::{build_caption_regex, WebhookConfig};

/// Value of `name`, treating an empty value as unset.
pub(crate) fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn required_env(name: &str) -> Result<String> {
    optional_env(name).ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", name))
}

pub(crate) fn number_env<T: FromStr>(name: &str, fallback: T) -> Result<T> {
    match optional_env(name) {
        None => Ok(fallback),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid number env var: {}", name)),
    }
}
