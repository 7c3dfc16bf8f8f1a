//! Error types for the editor layer.

use recon_types::SubmissionSeq;
use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Result type for submission gating.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors that can occur in editor sessions and their collaborators.
#[derive(Debug, Error)]
pub enum EditorError {
    /// The update service reported a failure.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    /// The auxiliary option source reported a failure.
    #[error("option source failed: {0}")]
    Options(String),

    /// The session event loop has shut down.
    #[error("session closed")]
    SessionClosed,

    /// The session task panicked or was cancelled.
    #[error("session task failed: {0}")]
    Task(String),

    /// A submission was refused before reaching the update service.
    #[error("submission rejected: {0}")]
    Rejected(#[from] ReconcileError),
}

/// Reasons a submit is refused. None of these reach the update service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("no pending edits to submit")]
    NothingToSubmit,

    #[error("pending edits contain no mutable fields")]
    NoMutableFields,

    #[error("no record is bound to this session")]
    NoRecord,

    #[error("submission {0} is not outstanding")]
    UnknownSubmission(SubmissionSeq),
}
