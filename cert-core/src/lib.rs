//! # cert-core
//!
//! Core types and rules for the cert bot: inbound update types, cert-day and weekly windows
//! ([`CertCalendar`]), chat identity matching, the [`Messenger`] / [`ChatDirectory`] seams with
//! their teloxide implementation, and tracing initialization. Used by `cert-bot`.

pub mod chat_id;
pub mod error;
pub mod logger;
pub mod messenger;
pub mod time;
pub mod types;

pub use error::{CertError, Result};
pub use logger::init_tracing;
pub use messenger::{send_with_migration, ChatDirectory, Messenger, SendFailure, TelegramClient};
pub use time::{CertCalendar, WeekRange, DEFAULT_TIMEZONE};
pub use types::{Chat, ChatMember, ChatMemberUpdated, Message, MessageSource, PhotoSize, Update, User};
