//! Webhook ingress: authenticates a Telegram delivery, syncs the roster, records certs.
//!
//! Every delivery gets a terminal reply. After authentication any failure becomes a generic
//! 500 so Telegram does not pile up retries on partial failures.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::any;
use axum::{Json, Router};
use cert_core::{ChatDirectory, Result, Update};
use chrono::Utc;
use serde_json::{json, Value};
use storage::StorageHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cert_events::save_cert_event_if_matched;
use crate::config::WebhookConfig;
use crate::storage_error;
use crate::user_sync::{sync_managed_user_from_update, UserSyncResult};

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Status and JSON body returned to Telegram.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookReply {
    pub status: StatusCode,
    pub body: Value,
}

impl WebhookReply {
    fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "ok": true }),
        }
    }

    fn failed() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "ok": false }),
        }
    }

    fn rejected(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            body: json!({ "ok": false, "error": error }),
        }
    }
}

/// `tgwh_<epoch-ms>_<8 hex>`
pub fn new_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("tgwh_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

pub struct WebhookService {
    config: WebhookConfig,
    storage: Arc<StorageHandle>,
    directory: Option<Arc<dyn ChatDirectory>>,
}

impl WebhookService {
    /// `directory` enables the live membership refresh during user sync.
    pub fn new(
        config: WebhookConfig,
        storage: Arc<StorageHandle>,
        directory: Option<Arc<dyn ChatDirectory>>,
    ) -> Self {
        Self {
            config,
            storage,
            directory,
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    pub async fn handle(&self, method: &Method, secret_header: Option<&str>, body: &[u8]) -> WebhookReply {
        let started = Instant::now();
        let request_id = new_request_id();
        let decoded = serde_json::from_slice::<Update>(body);

        let update = decoded.as_ref().ok();
        info!(
            request_id = %request_id,
            method = %method,
            update_id = update.map(|u| u.update_id),
            has_message = update.is_some_and(|u| u.message.is_some()),
            has_edited_message = update.is_some_and(|u| u.edited_message.is_some()),
            has_channel_post = update.is_some_and(|u| u.channel_post.is_some()),
            has_edited_channel_post = update.is_some_and(|u| u.edited_channel_post.is_some()),
            has_chat_member = update.is_some_and(|u| u.chat_member.is_some()),
            "Telegram webhook request received"
        );

        if *method != Method::POST {
            warn!(
                request_id = %request_id,
                reason = "method_not_allowed",
                method = %method,
                "Telegram webhook rejected"
            );
            return WebhookReply::rejected(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        if let Some(expected) = &self.config.webhook_secret_token {
            if secret_header != Some(expected.as_str()) {
                warn!(
                    request_id = %request_id,
                    reason = "invalid_secret_token",
                    has_secret_header = secret_header.is_some(),
                    "Telegram webhook rejected"
                );
                return WebhookReply::rejected(StatusCode::UNAUTHORIZED, "Unauthorized");
            }
            debug!(request_id = %request_id, "Telegram webhook secret validated");
        }

        let update = match decoded {
            Ok(update) => update,
            Err(e) => {
                error!(
                    request_id = %request_id,
                    error = %e,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Telegram webhook failed"
                );
                return WebhookReply::failed();
            }
        };

        match self.process(&request_id, &update).await {
            Ok((saved, upsert_count)) => {
                info!(
                    request_id = %request_id,
                    update_id = update.update_id,
                    saved,
                    user_upsert_count = upsert_count,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Telegram webhook handled"
                );
                WebhookReply::ok()
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    update_id = update.update_id,
                    error = %e,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Telegram webhook failed"
                );
                WebhookReply::failed()
            }
        }
    }

    /// User sync, then cert classification. Returns `(saved, user_upsert_count)`.
    async fn process(&self, request_id: &str, update: &Update) -> Result<(bool, u32)> {
        let storage = self.storage.get().await.map_err(storage_error)?;

        let sync = sync_managed_user_from_update(
            update,
            &self.config.group_chat_id,
            &storage.users,
            self.directory.as_deref(),
        )
        .await?;
        log_sync_result(request_id, update.update_id, &sync);

        let saved = save_cert_event_if_matched(update, &self.config, &storage.events).await?;
        Ok((saved, sync.upsert_count))
    }
}

fn log_sync_result(request_id: &str, update_id: i64, sync: &UserSyncResult) {
    let skipped_reasons = sync.skipped_reason_names().join(",");
    info!(
        request_id = %request_id,
        update_id,
        user_upsert_count = sync.upsert_count,
        user_message_source = sync.message_source.as_str(),
        configured_chat_id = %sync.configured_chat_id,
        incoming_message_chat_id = sync.incoming_message_chat_id.as_deref(),
        incoming_chat_member_chat_id = sync.incoming_chat_member_chat_id.as_deref(),
        message_present = sync.message_present,
        message_chat_matched = sync.message_chat_matched,
        message_has_from = sync.message_has_from,
        chat_member_present = sync.chat_member_present,
        chat_member_chat_matched = sync.chat_member_chat_matched,
        skipped_reasons = %skipped_reasons,
        "Telegram webhook user sync result"
    );

    if sync.message_present && !sync.message_chat_matched {
        warn!(
            request_id = %request_id,
            update_id,
            configured_chat_id = %sync.configured_chat_id,
            incoming_message_chat_id = sync.incoming_message_chat_id.as_deref(),
            "Telegram webhook message chat id mismatch"
        );
    }

    if sync.chat_member_present && !sync.chat_member_chat_matched {
        warn!(
            request_id = %request_id,
            update_id,
            configured_chat_id = %sync.configured_chat_id,
            incoming_chat_member_chat_id = sync.incoming_chat_member_chat_id.as_deref(),
            "Telegram webhook chat member chat id mismatch"
        );
    }

    if sync.upsert_count == 0 {
        warn!(
            request_id = %request_id,
            update_id,
            skipped_reasons = %skipped_reasons,
            "Telegram webhook user sync skipped"
        );
    }
}

async fn webhook(
    State(service): State<Arc<WebhookService>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let secret = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    let reply = service.handle(&method, secret, &body).await;
    (reply.status, Json(reply.body))
}

/// Routes `/webhook` (all methods) to the service.
pub fn router(service: Arc<WebhookService>) -> Router {
    Router::new()
        .route("/webhook", any(webhook))
        .with_state(service)
}

/// Binds `bind_addr` and serves [`router`] until the process stops.
pub async fn serve(service: Arc<WebhookService>, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "Webhook server listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}
