//! Core type definitions for the record reconciliation core.
//!
//! This crate defines the small, domain-agnostic vocabulary shared by the
//! schema and editor crates:
//! - [`Record`]: an ordered key/value snapshot of a server-owned entity
//! - [`RecordId`], [`SessionId`], [`SubmissionSeq`]: identifiers
//! - [`structurally_equal`]: the deep equality that drives every
//!   "did this field change?" decision
//!
//! Field values are plain JSON values. Nothing here knows which keys a
//! record is allowed to carry; that is the job of `recon-model`.

mod ids;
mod record;
mod value;

pub use ids::{RecordId, SessionId, SubmissionSeq};
pub use record::Record;
pub use value::{FieldMap, FieldValue, field_equal, maps_equal, structurally_equal};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid record id: {0:?}")]
    InvalidRecordId(String),

    #[error("record snapshot must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}
