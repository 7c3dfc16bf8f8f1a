//! Reconciliation state for one editor session.
//!
//! Merges three sources of truth for a single record:
//! - the **baseline**, the snapshot the session last accepted as authoritative
//! - the operator's **local edits**, kept only while they differ from baseline
//! - **remote drift**, mutable fields the server changed since the baseline
//!   was captured that our own submissions do not explain
//!
//! The baseline only advances when an incoming snapshot is recognized as the
//! echo of our own submission. An independent remote change is recorded as
//! drift and surfaced; it never silently overwrites in-progress work.

use recon_model::FieldSchema;
use recon_types::{FieldMap, FieldValue, Record, SubmissionSeq, field_equal, maps_equal};
use std::sync::Arc;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticLog, FieldOrigin};
use crate::error::{ReconcileError, ReconcileResult};

/// A payload handed to the update service, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub seq: SubmissionSeq,
    pub payload: FieldMap,
}

/// What an operator input did to the local edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The value differs from baseline and is now a local edit.
    Recorded,
    /// The value equals baseline; any local edit for the key is gone.
    Reverted,
    /// The key is unknown or read-only; nothing changed.
    Rejected,
}

/// What applying a snapshot did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot confirmed our own submissions up to and including `through`.
    /// Baseline was reset and local edits and drift cleared.
    SelfEcho { through: SubmissionSeq },
    /// The snapshot was not our echo; `changed` lists the drifted keys
    /// (empty when nothing mutable changed).
    RemoteDrift { changed: Vec<String> },
}

/// Per-field reconciliation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    Clean,
    /// Edited locally, unchanged remotely.
    Edited,
    /// Changed remotely, not edited locally.
    Drifted,
    /// Edited locally and changed remotely to a different value.
    Conflicted,
}

/// A field the operator and the server both changed, to different values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConflict {
    pub key: String,
    pub baseline: Option<FieldValue>,
    pub local: FieldValue,
    pub remote: FieldValue,
}

/// Conflict-tracking state for one record.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    schema: Arc<FieldSchema>,
    baseline: Record,
    local_edits: FieldMap,
    remote_drift: FieldMap,
    /// Submissions not yet confirmed by an echo, oldest first.
    outstanding: Vec<Submission>,
    next_seq: SubmissionSeq,
    diagnostics: DiagnosticLog,
}

impl ReconciliationState {
    /// Creates a state whose baseline is `record` projected onto `schema`.
    pub fn new(record: &Record, schema: Arc<FieldSchema>) -> Self {
        Self::with_diagnostics(record, schema, DiagnosticLog::default())
    }

    /// Like [`new`](Self::new), reporting into a caller-supplied log.
    pub fn with_diagnostics(
        record: &Record,
        schema: Arc<FieldSchema>,
        diagnostics: DiagnosticLog,
    ) -> Self {
        let mut state = Self {
            schema: Arc::clone(&schema),
            baseline: Record::new(),
            local_edits: FieldMap::new(),
            remote_drift: FieldMap::new(),
            outstanding: Vec::new(),
            next_seq: SubmissionSeq::FIRST,
            diagnostics,
        };
        state.initialize(record, schema);
        state
    }

    /// Continues sequence numbering after `last`, so submissions from an
    /// earlier state of the same session can never be confused with ours.
    #[must_use]
    pub fn continuing_after(mut self, last: SubmissionSeq) -> Self {
        if last >= self.next_seq {
            self.next_seq = last.next();
        }
        self
    }

    /// Resets the baseline to `record` and clears edits, drift and
    /// submission history. Unknown keys are reported and dropped.
    pub fn initialize(&mut self, record: &Record, schema: Arc<FieldSchema>) {
        self.schema = schema;
        self.outstanding.clear();
        self.rebase(record);
    }

    /// Applies a full snapshot of the record as delivered by the store.
    pub fn apply_incoming_snapshot(&mut self, next: &Record) -> SnapshotOutcome {
        let candidate = self.candidate_drift(next);

        if let Some(pos) = self.matching_submission(&candidate) {
            let through = self.outstanding[pos].seq;
            self.outstanding.drain(..=pos);
            self.rebase(next);
            debug!(%through, "snapshot recognized as own submission echo");
            return SnapshotOutcome::SelfEcho { through };
        }

        for key in next.keys().filter(|k| !self.schema.is_known(k)) {
            self.diagnostics.report(Diagnostic::UnknownField {
                key: key.clone(),
                origin: FieldOrigin::Snapshot,
            });
        }

        let changed: Vec<String> = candidate.keys().cloned().collect();
        if !changed.is_empty() {
            debug!(keys = ?changed, "remote drift recorded");
        }
        self.remote_drift = candidate;
        SnapshotOutcome::RemoteDrift { changed }
    }

    /// Records operator input for `key`.
    ///
    /// A value structurally equal to baseline removes the edit; there is no
    /// other notion of "empty".
    pub fn set_field_value(&mut self, key: &str, value: FieldValue) -> EditOutcome {
        let access = self.schema.access(key);
        if !access.is_mutable() {
            let diagnostic = if access.is_known() {
                Diagnostic::ImmutableFieldWrite {
                    key: key.to_string(),
                    origin: FieldOrigin::Input,
                }
            } else {
                Diagnostic::UnknownField {
                    key: key.to_string(),
                    origin: FieldOrigin::Input,
                }
            };
            self.diagnostics.report(diagnostic);
            return EditOutcome::Rejected;
        }

        if field_equal(self.baseline.get(key), Some(&value)) {
            self.local_edits.remove(key);
            EditOutcome::Reverted
        } else {
            self.local_edits.insert(key.to_string(), value);
            EditOutcome::Recorded
        }
    }

    /// Drops the local edit for `key`. Returns whether there was one.
    pub fn revert_field(&mut self, key: &str) -> bool {
        self.local_edits.remove(key).is_some()
    }

    /// Drops every local edit. Baseline and drift are untouched.
    pub fn discard_edits(&mut self) {
        self.local_edits.clear();
    }

    /// Baseline overlaid with local edits, in schema order.
    pub fn merged_view(&self) -> Record {
        self.schema
            .keys()
            .filter_map(|key| {
                self.local_edits
                    .get(key)
                    .or_else(|| self.baseline.get(key))
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect()
    }

    pub fn has_pending_edits(&self) -> bool {
        !self.local_edits.is_empty()
    }

    pub fn baseline(&self) -> &Record {
        &self.baseline
    }

    pub fn local_edits(&self) -> &FieldMap {
        &self.local_edits
    }

    pub fn remote_drift(&self) -> &FieldMap {
        &self.remote_drift
    }

    /// Payload of the most recent submission still awaiting its echo.
    pub fn last_submitted(&self) -> Option<&FieldMap> {
        self.outstanding.last().map(|s| &s.payload)
    }

    /// Submissions awaiting their echo, oldest first.
    pub fn outstanding(&self) -> &[Submission] {
        &self.outstanding
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub(crate) fn schema_handle(&self) -> Arc<FieldSchema> {
        Arc::clone(&self.schema)
    }

    /// Status of one field, or `None` for keys outside the schema.
    pub fn field_status(&self, key: &str) -> Option<FieldStatus> {
        if !self.schema.is_known(key) {
            return None;
        }
        let status = match (self.local_edits.get(key), self.remote_drift.get(key)) {
            (None, None) => FieldStatus::Clean,
            (Some(_), None) => FieldStatus::Edited,
            (None, Some(_)) => FieldStatus::Drifted,
            (Some(local), Some(remote)) if field_equal(Some(local), Some(remote)) => {
                FieldStatus::Edited
            }
            (Some(_), Some(_)) => FieldStatus::Conflicted,
        };
        Some(status)
    }

    /// Fields edited locally that the server changed to a different value.
    pub fn conflicts(&self) -> Vec<FieldConflict> {
        self.schema
            .keys()
            .filter_map(|key| {
                let local = self.local_edits.get(key)?;
                let remote = self.remote_drift.get(key)?;
                if field_equal(Some(local), Some(remote)) {
                    return None;
                }
                Some(FieldConflict {
                    key: key.to_string(),
                    baseline: self.baseline.get(key).cloned(),
                    local: local.clone(),
                    remote: remote.clone(),
                })
            })
            .collect()
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut DiagnosticLog {
        &mut self.diagnostics
    }

    /// Drains retained diagnostics, oldest first.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    /// Registers `payload` as sent and returns it tagged with a fresh sequence number.
    pub(crate) fn record_submission(&mut self, payload: FieldMap) -> Submission {
        let submission = Submission {
            seq: self.next_seq,
            payload,
        };
        self.next_seq = self.next_seq.next();
        self.outstanding.push(submission.clone());
        submission
    }

    /// Forgets an outstanding submission that will never echo (the update failed).
    pub fn withdraw_submission(&mut self, seq: SubmissionSeq) -> ReconcileResult<Submission> {
        let pos = self
            .outstanding
            .iter()
            .position(|s| s.seq == seq)
            .ok_or(ReconcileError::UnknownSubmission(seq))?;
        Ok(self.outstanding.remove(pos))
    }

    /// Mutable keys whose value in `next` differs from baseline.
    /// A key missing from `next` drifts to `null`.
    fn candidate_drift(&self, next: &Record) -> FieldMap {
        self.schema
            .mutable_keys()
            .filter(|key| !field_equal(next.get(key), self.baseline.get(key)))
            .map(|key| {
                let value = next.get(key).cloned().unwrap_or(FieldValue::Null);
                (key.to_string(), value)
            })
            .collect()
    }

    /// Position of the newest outstanding submission whose cumulative effect
    /// (together with every older outstanding submission) is exactly
    /// `candidate`. With one submission outstanding this is plain equality
    /// with the last submitted payload.
    fn matching_submission(&self, candidate: &FieldMap) -> Option<usize> {
        let mut cumulative = FieldMap::new();
        let mut found = None;
        for (pos, submission) in self.outstanding.iter().enumerate() {
            cumulative.extend(
                submission
                    .payload
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            let expected: FieldMap = cumulative
                .iter()
                .filter(|(k, v)| !field_equal(self.baseline.get(k.as_str()), Some(*v)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if maps_equal(candidate, &expected) {
                found = Some(pos);
            }
        }
        found
    }

    /// Replaces the baseline and clears edits and drift, keeping submission history.
    fn rebase(&mut self, record: &Record) {
        let projection = self.schema.project(record);
        for key in projection.unknown {
            self.diagnostics.report(Diagnostic::UnknownField {
                key,
                origin: FieldOrigin::Snapshot,
            });
        }
        self.baseline = projection.known;
        self.local_edits.clear();
        self.remote_drift.clear();
    }
}
