//! Base config: storage, logging, Telegram API endpoint and accounting time zone. Loaded from env.

use anyhow::Result;
use cert_core::{CertCalendar, DEFAULT_TIMEZONE};

use super::optional_env;

/// Settings shared by the webhook server and the jobs.
#[derive(Debug, Clone)]
pub struct BaseConfig {
    /// DATABASE_URL: SQLite file path or `sqlite:` URL
    pub database_url: String,
    /// LOG_FILE: when set, logs are also appended here
    pub log_file: Option<String>,
    /// TELEGRAM_API_URL or TELOXIDE_API_URL
    pub telegram_api_url: Option<String>,
    /// CERT_TIMEZONE: IANA zone for cert days and weeks
    pub timezone: String,
}

impl BaseConfig {
    pub fn load() -> Result<Self> {
        let database_url =
            optional_env("DATABASE_URL").unwrap_or_else(|| "./data/cert_bot.db".to_string());
        let log_file = optional_env("LOG_FILE");
        let telegram_api_url =
            optional_env("TELEGRAM_API_URL").or_else(|| optional_env("TELOXIDE_API_URL"));
        let timezone =
            optional_env("CERT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.name().to_string());

        Ok(Self {
            database_url,
            log_file,
            telegram_api_url,
            timezone,
        })
    }

    /// Validate config (API URL must parse, time zone must be known).
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        self.calendar()?;
        Ok(())
    }

    pub fn calendar(&self) -> Result<CertCalendar> {
        Ok(CertCalendar::from_name(&self.timezone)?)
    }
}
