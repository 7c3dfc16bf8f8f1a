//! Submission gate: decides whether edits may be sent and what exactly is sent.

use recon_model::FieldSchema;
use recon_types::{FieldMap, RecordId, SubmissionSeq};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, FieldOrigin};
use crate::error::{EditorResult, ReconcileError, ReconcileResult};
use crate::service::UpdateService;
use crate::state::{ReconciliationState, Submission};

/// Completion of an update call, delivered back to the session as an event.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub seq: SubmissionSeq,
    pub record_id: RecordId,
    pub result: EditorResult<()>,
}

/// Local edits filtered to keys `schema` marks mutable.
///
/// A non-mutable key in the local edits is a defect; it is reported and
/// left out, never sent.
pub fn build_payload(state: &mut ReconciliationState, schema: &FieldSchema) -> FieldMap {
    let mut payload = FieldMap::new();
    let mut rejected = Vec::new();
    for (key, value) in state.local_edits() {
        if schema.is_mutable(key) {
            payload.insert(key.clone(), value.clone());
        } else {
            rejected.push(key.clone());
        }
    }
    for key in rejected {
        let diagnostic = if schema.is_known(&key) {
            Diagnostic::ImmutableFieldWrite {
                key,
                origin: FieldOrigin::Payload,
            }
        } else {
            Diagnostic::UnknownField {
                key,
                origin: FieldOrigin::Payload,
            }
        };
        state.diagnostics_mut().report(diagnostic);
    }
    payload
}

/// Whether a submit would currently be accepted.
pub fn can_submit(state: &ReconciliationState) -> bool {
    state.has_pending_edits()
}

/// Sends the pending edits for `record_id` through `service`.
///
/// The payload is recorded as the last submission before the call is
/// spawned; the baseline is not touched. `on_settled` runs on the spawned
/// task once the service answers. Must be called within a tokio runtime.
pub fn submit<F>(
    state: &mut ReconciliationState,
    record_id: &RecordId,
    service: Arc<dyn UpdateService>,
    on_settled: F,
) -> ReconcileResult<Submission>
where
    F: FnOnce(SubmissionOutcome) + Send + 'static,
{
    if !can_submit(state) {
        state.diagnostics_mut().report(Diagnostic::EmptySubmission);
        return Err(ReconcileError::NothingToSubmit);
    }

    let schema = state.schema_handle();
    let payload = build_payload(state, &schema);
    if payload.is_empty() {
        state.diagnostics_mut().report(Diagnostic::NoValidFields);
        return Err(ReconcileError::NoMutableFields);
    }

    let submission = state.record_submission(payload);
    debug!(
        seq = %submission.seq,
        record = %record_id,
        keys = ?submission.payload.keys().collect::<Vec<_>>(),
        "submitting update"
    );

    let seq = submission.seq;
    let id = record_id.clone();
    let payload = submission.payload.clone();
    tokio::spawn(async move {
        let result = service.update_record(&id, payload).await;
        if let Err(e) = &result {
            warn!(%seq, record = %id, "update call failed: {e}");
        }
        on_settled(SubmissionOutcome {
            seq,
            record_id: id,
            result,
        });
    });

    Ok(submission)
}
