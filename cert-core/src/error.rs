//! Error types for the cert bot core.
//!
//! [`CertError`] is the top-level error shared by the core and the application crate.

use thiserror::Error;

/// Top-level error (storage, Telegram transport, config, malformed update, IO).
#[derive(Error, Debug)]
pub enum CertError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for CertError {
    fn from(e: serde_json::Error) -> Self {
        CertError::InvalidUpdate(e.to_string())
    }
}

/// Result type for core operations; uses [`CertError`].
pub type Result<T> = std::result::Result<T, CertError>;
