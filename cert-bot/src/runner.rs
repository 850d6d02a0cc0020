//! Builds configured components and runs the webhook server or a job.

use std::sync::Arc;

use anyhow::Result;
use cert_core::{init_tracing, CertCalendar, ChatDirectory, TelegramClient};
use chrono::Utc;
use storage::{Storage, StorageHandle};
use tracing::{info, instrument};

use crate::config::{BaseConfig, JobConfig, WebhookConfig};
use crate::jobs;
use crate::storage_error;
use crate::webhook::{serve, WebhookService};

/// Loads base config, validates it and initializes tracing.
pub fn init(log_file_override: Option<&str>) -> Result<BaseConfig> {
    let base = BaseConfig::load()?;
    base.validate()?;
    init_tracing(log_file_override.or(base.log_file.as_deref()))?;
    Ok(base)
}

/// Builds the webhook service. A bot token enables membership refresh.
pub fn build_webhook_service(base: &BaseConfig, config: WebhookConfig) -> Result<WebhookService> {
    let directory: Option<Arc<dyn ChatDirectory>> = match &config.bot_token {
        Some(token) => Some(Arc::new(TelegramClient::with_api_url(
            token.clone(),
            base.telegram_api_url.as_deref(),
        )?)),
        None => None,
    };
    let storage = Arc::new(StorageHandle::new(base.database_url.clone()));
    Ok(WebhookService::new(config, storage, directory))
}

#[instrument(skip_all)]
pub async fn run_webhook(base: &BaseConfig) -> Result<()> {
    let config = WebhookConfig::load()?;
    let bind_addr = config.bind_addr.clone();
    info!(
        group_chat_id = %config.group_chat_id,
        membership_refresh = config.bot_token.is_some(),
        caption_filter = config.caption_regex.is_some(),
        "Starting webhook server"
    );
    let service = Arc::new(build_webhook_service(base, config)?);
    serve(service, &bind_addr).await
}

/// Everything a job needs: job config, calendar, storage and Telegram client.
pub struct JobContext {
    pub config: JobConfig,
    pub calendar: CertCalendar,
    pub storage: StorageHandle,
    pub telegram: TelegramClient,
}

impl JobContext {
    pub fn load(base: &BaseConfig) -> Result<Self> {
        let config = JobConfig::load()?;
        let telegram =
            TelegramClient::with_api_url(config.bot_token.clone(), base.telegram_api_url.as_deref())?;
        Ok(Self {
            config,
            calendar: base.calendar()?,
            storage: StorageHandle::new(base.database_url.clone()),
            telegram,
        })
    }

    async fn storage(&self) -> Result<&Storage> {
        let storage = self.storage.get().await.map_err(storage_error)?;
        Ok(storage)
    }

    pub async fn daily_status(&self) -> Result<String> {
        let storage = self.storage().await?;
        jobs::run_daily_status(&self.config, &self.calendar, &storage.events, &self.telegram, Utc::now()).await
    }

    pub async fn weekly_settlement(&self) -> Result<String> {
        let storage = self.storage().await?;
        jobs::run_weekly_settlement(
            &self.config,
            &self.calendar,
            &storage.events,
            &storage.users,
            &self.telegram,
            Utc::now(),
        )
        .await
    }

    pub async fn user_add(&self, user_id: &str, name: &str) -> Result<()> {
        let storage = self.storage().await?;
        jobs::user_add(&self.config, &storage.users, user_id, name).await
    }

    pub async fn user_remove(&self, user_id: &str) -> Result<()> {
        let storage = self.storage().await?;
        jobs::user_remove(&storage.users, user_id, Utc::now()).await
    }

    pub async fn user_reactivate(&self, user_id: &str) -> Result<()> {
        let storage = self.storage().await?;
        jobs::user_reactivate(&storage.users, user_id, Utc::now()).await
    }

    pub async fn user_sync(&self, user_id: &str) -> Result<(String, String, bool)> {
        let storage = self.storage().await?;
        jobs::user_sync(&self.config, &storage.users, &self.telegram, user_id).await
    }

    pub async fn participants(&self) -> Result<String> {
        let storage = self.storage().await?;
        jobs::participants_draft(&self.config, &storage.events, &self.telegram).await
    }
}
