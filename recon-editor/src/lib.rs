//! Record editing sessions with conflict-aware reconciliation.
//!
//! An operator edits a server-owned record while the server keeps pushing
//! fresh snapshots of it. This crate keeps the two apart: local edits are
//! never overwritten by remote changes, and the baseline only advances once
//! the server echoes back what this client sent.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **State**: [`ReconciliationState`] tracks baseline, local edits,
//!   remote drift and outstanding submissions for one record
//! - **Gate**: decides whether edits may be sent and filters the payload to
//!   mutable fields
//! - **Session**: [`RecordSession`] binds a state to the routed record, owns
//!   the viewing/editing toggle and subscribes to store changes
//! - **Runtime**: [`spawn_session`] drives a session from a single inbox
//! - **Collaborators**: [`RecordStore`], [`UpdateService`], [`OptionSource`] and
//!   [`ValueLabels`] are injected; in-memory versions ship for tests
//!
//! ## Edit cycle
//!
//! 1. **Mount**: resolve the record, start in viewing mode
//! 2. **Edit**: inputs that differ from baseline become local edits
//! 3. **Submit**: mutable edits are sent and remembered as outstanding
//! 4. **Echo**: a snapshot matching the outstanding payload resets the
//!    baseline; any other change is recorded as drift
//!
//! # Example
//!
//! ```
//! use recon_editor::ReconciliationState;
//! use recon_model::RecordFormat;
//! use recon_types::Record;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let schema = Arc::new(RecordFormat::user_accounts().fields);
//! let record = Record::from_value(json!({"id": 1, "username": "bob", "locked": false})).unwrap();
//!
//! let mut state = ReconciliationState::new(&record, schema);
//! state.set_field_value("locked", json!(true));
//! assert!(state.has_pending_edits());
//! ```

pub mod diagnostics;
mod error;
pub mod gate;
pub mod options;
pub mod runtime;
pub mod service;
pub mod session;
pub mod state;
pub mod store;

pub use diagnostics::{Diagnostic, DiagnosticLog, FieldOrigin, Severity};
pub use error::{EditorError, EditorResult, ReconcileError, ReconcileResult};
pub use gate::{SubmissionOutcome, build_payload, can_submit, submit};
pub use options::{
    ChoiceOption, OptionSource, StaticOptionSource, StaticValueLabels, ValueLabels, choices_for,
};
pub use runtime::{SessionCommand, SessionHandle, spawn_session};
pub use service::UpdateService;
pub use session::{
    Collaborators, EditorMode, FieldView, ProcessingStatus, RecordSession, SessionConfig,
    SessionView,
};
pub use state::{
    EditOutcome, FieldConflict, FieldStatus, ReconciliationState, SnapshotOutcome, Submission,
};
pub use store::{ChangeListener, ListenerId, RecordStore};
