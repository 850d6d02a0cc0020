//! Persistence models: cert events, managed users and the tri-state field patch.

mod cert_event;
mod field_patch;
mod managed_user;

pub use cert_event::{CertEvent, CertEventSummary, UNKNOWN_USER};
pub use field_patch::FieldPatch;
pub use managed_user::{ManagedUser, UserPatch, UserSource};
pub(crate) use managed_user::normalize_name;
