//! Cert event classification and recording.
//!
//! A cert is a photo posted to the configured group chat, optionally with a caption that
//! matches the configured pattern. Only `update.message` is considered; edits and channel
//! posts never create certs.

use chrono::{DateTime, Utc};
use cert_core::{chat_id, CertError, Message, Result, Update};
use storage::{CertEvent, CertEventStore, UNKNOWN_USER};
use tracing::{debug, info, instrument};

use crate::config::WebhookConfig;
use crate::storage_error;

/// Whether `message` qualifies as a cert for the configured chat.
pub fn is_cert_message(message: &Message, config: &WebhookConfig) -> bool {
    if !message.chat.is_group() || !message.has_photo() {
        return false;
    }

    if !chat_id::matches(&message.chat.id.to_string(), &config.group_chat_id) {
        return false;
    }

    match &config.caption_regex {
        Some(regex) => regex.is_match(message.caption.as_deref().unwrap_or("")),
        None => true,
    }
}

/// Author name for a cert: `"first last"`, else username, else `unknown`.
fn author_name(message: &Message) -> String {
    message
        .from
        .as_ref()
        .and_then(|user| {
            user.full_name()
                .or_else(|| user.username.clone().filter(|u| !u.is_empty()))
        })
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

/// Builds the event record for a qualifying message. Fails only when the message has no photo
/// or an out-of-range date.
pub fn build_cert_event(update_id: i64, message: &Message, now: DateTime<Utc>) -> Result<CertEvent> {
    let photo = message
        .largest_photo()
        .ok_or_else(|| CertError::InvalidUpdate("cert message has no photo".to_string()))?;
    let telegram_date = DateTime::from_timestamp(message.date, 0).ok_or_else(|| {
        CertError::InvalidUpdate(format!("message date out of range: {}", message.date))
    })?;

    Ok(CertEvent {
        event_id: CertEvent::generate_id(),
        update_id,
        chat_id: message.chat.id.to_string(),
        message_id: message.message_id,
        user_id: message
            .from
            .as_ref()
            .map(|user| user.id.to_string())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        user_name: author_name(message),
        caption: message.caption.clone().unwrap_or_default(),
        photo_file_id: photo.file_id.clone(),
        telegram_date,
        created_at: now,
    })
}

/// Records a cert event when the update's message qualifies. Returns whether one was saved;
/// storage errors propagate.
#[instrument(skip_all, fields(update_id = update.update_id))]
pub async fn save_cert_event_if_matched(
    update: &Update,
    config: &WebhookConfig,
    store: &dyn CertEventStore,
) -> Result<bool> {
    let Some(message) = update.message.as_ref().filter(|m| is_cert_message(m, config)) else {
        debug!(
            update_id = update.update_id,
            reason = "not_cert_message",
            "Telegram update ignored"
        );
        return Ok(false);
    };

    let event = build_cert_event(update.update_id, message, Utc::now())?;
    store
        .insert_or_merge_event(&event)
        .await
        .map_err(storage_error)?;

    info!(
        event_id = %event.event_id,
        update_id = update.update_id,
        chat_id = %event.chat_id,
        message_id = event.message_id,
        user_id = %event.user_id,
        "Cert event saved"
    );

    Ok(true)
}
