//! Storage crate: cert event and managed user persistence on SQLite.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – CertEvent, CertEventSummary, ManagedUser, UserPatch, FieldPatch
//! - [`repository`] – CertEventStore / UserStore traits
//! - [`cert_event_repo`] – CertEventRepository (SQLite)
//! - [`user_repo`] – UserRepository (SQLite)
//! - [`storage`] – Storage bundle and lazily-initialized StorageHandle
//! - [`sqlite_pool`] – SqlitePoolManager

mod cert_event_repo;
mod error;
mod models;
mod repository;
mod sqlite_pool;
mod storage;
mod user_repo;

pub use cert_event_repo::CertEventRepository;
pub use error::{Result, StorageError};
pub use models::{
    CertEvent, CertEventSummary, FieldPatch, ManagedUser, UserPatch, UserSource, UNKNOWN_USER,
};
pub use repository::{CertEventStore, UserStore};
pub use sqlite_pool::SqlitePoolManager;
pub use storage::{Storage, StorageHandle};
pub use user_repo::UserRepository;
