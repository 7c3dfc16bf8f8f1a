//! Record session controller.
//!
//! Binds one [`ReconciliationState`] to the record selected by the routing
//! parameter, keeps it fed with store snapshots, and owns the
//! viewing/editing mode toggle. The session never blocks: update calls and
//! the option fetch run on spawned tasks and report back through the
//! session inbox as [`SessionCommand`]s.

use recon_model::{FieldSchema, RecordFormat};
use recon_types::{FieldValue, Record, SessionId, SubmissionSeq};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};

use crate::diagnostics::{DEFAULT_DIAGNOSTIC_CAPACITY, Diagnostic, DiagnosticLog};
use crate::error::{EditorResult, ReconcileError, ReconcileResult};
use crate::gate::{self, SubmissionOutcome};
use crate::options::{ChoiceOption, OptionSource, ValueLabels, choices_for};
use crate::runtime::SessionCommand;
use crate::service::UpdateService;
use crate::state::{
    EditOutcome, FieldConflict, FieldStatus, ReconciliationState, SnapshotOutcome, Submission,
};
use crate::store::{ListenerId, RecordStore};

/// Configuration for a record session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How records are located, labelled and validated.
    pub format: RecordFormat,
    /// Diagnostics retained per session before the oldest are evicted.
    pub diagnostic_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format: RecordFormat::user_accounts(),
            diagnostic_capacity: DEFAULT_DIAGNOSTIC_CAPACITY,
        }
    }
}

/// External collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub updates: Arc<dyn UpdateService>,
    pub options: Option<Arc<dyn OptionSource>>,
    pub labels: Option<Arc<dyn ValueLabels>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    Viewing,
    Editing,
}

/// Busy indicator for the bound record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    Idle,
    /// A change from this client is being applied.
    Saving { label: String },
    /// Someone else changed the record and the new snapshot is on its way.
    UpdatedRemotely { label: String },
}

impl ProcessingStatus {
    /// Text for a blocking overlay, if one should be shown.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Saving { label } => Some(format!("Saving changes to '{label}'")),
            Self::UpdatedRemotely { label } => {
                Some(format!("'{label}' was updated remotely."))
            }
        }
    }
}

/// Presentation of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub key: String,
    pub value: Option<FieldValue>,
    /// Display name for `value`, when a label lookup knows one.
    pub display: Option<String>,
    /// True only in editing mode, for mutable fields.
    pub editable: bool,
    pub status: FieldStatus,
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: SessionId,
    pub route: String,
    pub mode: EditorMode,
    /// Latest snapshot while viewing; merged view while editing.
    pub record: Option<Record>,
    pub processing: ProcessingStatus,
    pub builtin: bool,
    pub can_submit: bool,
    pub fields: Vec<FieldView>,
    pub conflicts: Vec<FieldConflict>,
    pub options: Option<Vec<ChoiceOption>>,
}

/// One operator's editing session over one routed record.
pub struct RecordSession {
    id: SessionId,
    config: SessionConfig,
    schema: Arc<FieldSchema>,
    collaborators: Collaborators,
    inbox: mpsc::UnboundedSender<SessionCommand>,
    listener: Option<ListenerId>,
    route: String,
    mode: EditorMode,
    target: Option<Record>,
    state: Option<ReconciliationState>,
    option_values: Option<Vec<String>>,
    last_seq: SubmissionSeq,
    diagnostics: DiagnosticLog,
    span: tracing::Span,
}

impl RecordSession {
    /// Mounts a session: subscribes to the store, resolves `route`, builds a
    /// fresh reconciliation state and requests options.
    ///
    /// Store notifications, update completions and option results are posted
    /// to `inbox`. Must be called within a tokio runtime when an option
    /// source is configured.
    pub fn mount(
        config: SessionConfig,
        collaborators: Collaborators,
        route: impl Into<String>,
        inbox: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        let id = SessionId::new();
        let route = route.into();
        let span = info_span!("record_session", session = %id);
        let schema = Arc::new(config.format.fields.clone());
        let diagnostics = DiagnosticLog::with_capacity(config.diagnostic_capacity);

        let mut session = Self {
            id,
            config,
            schema,
            collaborators,
            inbox,
            listener: None,
            route,
            mode: EditorMode::Viewing,
            target: None,
            state: None,
            option_values: None,
            last_seq: SubmissionSeq::new(0),
            diagnostics,
            span,
        };

        let tx = session.inbox.clone();
        let listener = session.collaborators.store.on_change(Arc::new(move || {
            let _ = tx.send(SessionCommand::StoreChanged);
        }));
        session.listener = Some(listener);

        session.bind();
        session.request_options();
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Latest resolved snapshot of the bound record.
    pub fn target(&self) -> Option<&Record> {
        self.target.as_ref()
    }

    pub fn state(&self) -> Option<&ReconciliationState> {
        self.state.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener.is_some()
    }

    /// Rebinds the session to another record. Same route is a no-op.
    pub fn set_route(&mut self, route: impl Into<String>) {
        let route = route.into();
        if route == self.route {
            return;
        }
        let _enter = self.span.clone().entered();
        info!(from = %self.route, to = %route, "route changed");
        self.route = route;
        self.bind();
    }

    /// Switches between viewing and editing. Either direction starts over
    /// from the latest snapshot; leaving editing discards unsent edits.
    pub fn switch_mode(&mut self, next: EditorMode) {
        if next == self.mode {
            return;
        }
        let _enter = self.span.clone().entered();
        if let Some(state) = &self.state {
            if next == EditorMode::Viewing && state.has_pending_edits() {
                debug!(
                    discarded = state.local_edits().len(),
                    "leaving edit mode with unsent edits"
                );
            }
        }
        self.mode = next;
        let fresh = self.fresh_state();
        self.replace_state(fresh);
    }

    /// Re-resolves the bound record after a store notification.
    ///
    /// A bound record is followed by its server id, so changes to the
    /// selection field (a rename) keep the session and its edits. The route
    /// is only consulted while nothing is bound.
    pub fn handle_store_changed(&mut self) {
        let _enter = self.span.clone().entered();
        let bound_id = self.target.as_ref().and_then(Record::id);
        let resolved = match &bound_id {
            Some(id) => self.collaborators.store.find_by_id(id),
            None => self.resolve(),
        };

        match resolved {
            Some(record) if self.state.is_some() && record.id() == bound_id => {
                if let Some(state) = self.state.as_mut() {
                    if let SnapshotOutcome::SelfEcho { through } =
                        state.apply_incoming_snapshot(&record)
                    {
                        debug!(%through, "own changes confirmed by store");
                    }
                }
                self.target = Some(record);
            }
            Some(record) => {
                debug!(route = %self.route, "record appeared");
                self.target = Some(record);
                self.mode = EditorMode::Viewing;
                let fresh = self.fresh_state();
                self.replace_state(fresh);
            }
            None => {
                if self.target.take().is_some() {
                    self.report(Diagnostic::RecordMissing {
                        route: self.route.clone(),
                    });
                }
                self.mode = EditorMode::Viewing;
                self.replace_state(None);
            }
        }
    }

    /// Applies operator input for `key`. Rejected while viewing.
    pub fn set_field_value(&mut self, key: &str, value: FieldValue) -> EditOutcome {
        let _enter = self.span.clone().entered();
        if self.mode == EditorMode::Viewing {
            self.report(Diagnostic::EditWhileViewing {
                key: key.to_string(),
            });
            return EditOutcome::Rejected;
        }
        match self.state.as_mut() {
            Some(state) => state.set_field_value(key, value),
            None => {
                self.report(Diagnostic::RecordMissing {
                    route: self.route.clone(),
                });
                EditOutcome::Rejected
            }
        }
    }

    /// Drops the local edit for `key`.
    pub fn revert_field(&mut self, key: &str) -> bool {
        self.state
            .as_mut()
            .is_some_and(|state| state.revert_field(key))
    }

    /// Sends the pending edits. The completion arrives later as
    /// [`SessionCommand::SubmissionSettled`].
    pub fn submit(&mut self) -> ReconcileResult<Submission> {
        let _enter = self.span.clone().entered();
        let Some(record_id) = self.target.as_ref().and_then(Record::id) else {
            self.report(Diagnostic::RecordMissing {
                route: self.route.clone(),
            });
            return Err(ReconcileError::NoRecord);
        };
        let Some(state) = self.state.as_mut() else {
            return Err(ReconcileError::NoRecord);
        };

        let tx = self.inbox.clone();
        let submission = gate::submit(
            state,
            &record_id,
            Arc::clone(&self.collaborators.updates),
            move |outcome| {
                let _ = tx.send(SessionCommand::SubmissionSettled(outcome));
            },
        )?;
        self.last_seq = self.last_seq.max(submission.seq);
        Ok(submission)
    }

    /// Handles the completion of an update call.
    pub fn handle_submission_settled(&mut self, outcome: SubmissionOutcome) {
        let _enter = self.span.clone().entered();
        let SubmissionOutcome {
            seq,
            record_id,
            result,
        } = outcome;
        match result {
            Ok(()) => debug!(%seq, record = %record_id, "update accepted; awaiting echo"),
            Err(e) => {
                self.report(Diagnostic::SubmissionFailed {
                    seq,
                    reason: e.to_string(),
                });
                if let Some(state) = self.state.as_mut() {
                    if let Err(stale) = state.withdraw_submission(seq) {
                        debug!("failed submission no longer tracked: {stale}");
                    }
                }
            }
        }
    }

    /// Stores the result of the option fetch.
    pub fn handle_options_loaded(&mut self, result: EditorResult<Vec<String>>) {
        let _enter = self.span.clone().entered();
        match result {
            Ok(options) => {
                debug!(count = options.len(), "options loaded");
                self.option_values = Some(options);
            }
            Err(e) => warn!("options unavailable: {e}"),
        }
    }

    pub fn can_submit(&self) -> bool {
        self.mode == EditorMode::Editing && self.state.as_ref().is_some_and(gate::can_submit)
    }

    /// The record as the operator should currently see it.
    pub fn current_record(&self) -> Option<Record> {
        match (self.mode, &self.state) {
            (EditorMode::Editing, Some(state)) => Some(state.merged_view()),
            _ => self.target.clone(),
        }
    }

    /// Busy indicator for the bound record. A local save takes precedence
    /// over a pending remote update.
    pub fn processing_status(&self) -> ProcessingStatus {
        let Some(target) = &self.target else {
            return ProcessingStatus::Idle;
        };
        let Some(id) = target.id() else {
            return ProcessingStatus::Idle;
        };
        let store = &self.collaborators.store;
        if store.is_task_pending(&id) {
            ProcessingStatus::Saving {
                label: self.config.format.label(target),
            }
        } else if store.is_remote_update_pending(&id) {
            ProcessingStatus::UpdatedRemotely {
                label: self.config.format.label(target),
            }
        } else {
            ProcessingStatus::Idle
        }
    }

    /// Builds the full presentation snapshot.
    pub fn view(&self) -> SessionView {
        let record = self.current_record();
        let editing = self.mode == EditorMode::Editing;

        let fields = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                let value = record.as_ref().and_then(|r| r.get(&field.key)).cloned();
                let display = match (&self.collaborators.labels, &value) {
                    (Some(labels), Some(v)) => labels.label_for(&field.key, v),
                    _ => None,
                };
                FieldView {
                    key: field.key.clone(),
                    value,
                    display,
                    editable: editing && field.mutable && self.state.is_some(),
                    status: self
                        .state
                        .as_ref()
                        .and_then(|s| s.field_status(&field.key))
                        .unwrap_or(FieldStatus::Clean),
                }
            })
            .collect();

        let options = match (&self.option_values, &self.config.format.option_key) {
            (Some(values), Some(key)) => Some(choices_for(
                values,
                record.as_ref().and_then(|r| r.get(key)),
            )),
            _ => None,
        };

        SessionView {
            session_id: self.id,
            route: self.route.clone(),
            mode: self.mode,
            builtin: self
                .target
                .as_ref()
                .is_some_and(|t| self.config.format.is_builtin(t)),
            processing: self.processing_status(),
            can_submit: self.can_submit(),
            conflicts: self
                .state
                .as_ref()
                .map(ReconciliationState::conflicts)
                .unwrap_or_default(),
            fields,
            options,
            record,
        }
    }

    /// Drains diagnostics from the session and its reconciliation state.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut all = self.diagnostics.drain();
        if let Some(state) = self.state.as_mut() {
            all.extend(state.take_diagnostics());
        }
        all
    }

    /// Unsubscribes from the store. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.collaborators.store.off_change(listener);
            let _enter = self.span.clone().entered();
            info!("session closed");
        }
    }

    /// Resolves the route, resets to viewing and builds a fresh state.
    fn bind(&mut self) {
        self.target = self.resolve();
        self.mode = EditorMode::Viewing;
        if self.target.is_none() {
            self.report(Diagnostic::RecordMissing {
                route: self.route.clone(),
            });
        }
        let fresh = self.fresh_state();
        self.replace_state(fresh);
    }

    fn resolve(&self) -> Option<Record> {
        self.collaborators
            .store
            .find_by_key(&self.config.format.selection_key, &self.route)
    }

    fn fresh_state(&self) -> Option<ReconciliationState> {
        let target = self.target.as_ref()?;
        let log = DiagnosticLog::with_capacity(self.config.diagnostic_capacity);
        Some(
            ReconciliationState::with_diagnostics(target, Arc::clone(&self.schema), log)
                .continuing_after(self.last_seq),
        )
    }

    /// Swaps in `next`, keeping whatever the outgoing state had reported.
    fn replace_state(&mut self, next: Option<ReconciliationState>) {
        if let Some(mut old) = std::mem::replace(&mut self.state, next) {
            self.diagnostics.absorb(old.diagnostics_mut());
        }
    }

    fn request_options(&self) {
        let Some(source) = self.collaborators.options.clone() else {
            return;
        };
        let tx = self.inbox.clone();
        tokio::spawn(async move {
            let result = source.request_options().await;
            let _ = tx.send(SessionCommand::OptionsLoaded(result));
        });
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }
}

impl Drop for RecordSession {
    fn drop(&mut self) {
        self.close();
    }
}

