//! # Cert bot application
//!
//! Webhook ingress (roster sync + cert recording), weekly ranking and settlement jobs, and the
//! roster CLI. Wires `cert-core` (time windows, chat ids, Telegram) and `storage` (SQLite).

pub mod aggregate;
pub mod cert_events;
pub mod cli;
pub mod config;
pub mod jobs;
pub mod report;
pub mod runner;
pub mod user_sync;
pub mod webhook;

pub use aggregate::{aggregate, count_by_user_between, WeeklyCount};
pub use cert_events::{build_cert_event, is_cert_message, save_cert_event_if_matched};
pub use cli::{Cli, Commands, UserCommands};
pub use config::{BaseConfig, JobConfig, Participant, WebhookConfig};
pub use report::{
    format_daily_status, format_weekly_settlement, format_won, rank_current_week,
    settlement_entries, FinePolicy, RankedEntry, SettlementEntry,
};
pub use runner::{build_webhook_service, JobContext};
pub use user_sync::{sync_managed_user_from_update, SkipReason, UserSyncResult};
pub use webhook::{router, serve, WebhookReply, WebhookService};

use cert_core::CertError;
use storage::StorageError;

/// Storage failures surface as [`CertError::Storage`] in the application.
pub(crate) fn storage_error(e: StorageError) -> CertError {
    CertError::Storage(e.to_string())
}
