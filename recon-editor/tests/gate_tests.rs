//! Tests for gate.rs: payload filtering and submission dispatch.

use pretty_assertions::assert_eq;
use recon_editor::service::mock::{RecordingUpdateService, UpdateCall};
use recon_editor::{
    Diagnostic, EditorError, FieldOrigin, ReconcileError, ReconciliationState, SubmissionOutcome,
    build_payload, can_submit, submit,
};
use recon_model::{FieldDescriptor, FieldSchema, RecordFormat};
use recon_types::{FieldMap, Record, RecordId, SubmissionSeq};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::oneshot;

fn schema() -> Arc<FieldSchema> {
    Arc::new(RecordFormat::user_accounts().fields)
}

fn bob() -> Record {
    Record::from_value(json!({"id": 1, "username": "bob", "locked": false})).unwrap()
}

fn fields(value: Value) -> FieldMap {
    serde_json::from_value(value).unwrap()
}

// ── build_payload ───────────────────────────────────────────────

#[test]
fn payload_contains_mutable_edits() {
    let mut state = ReconciliationState::new(&bob(), schema());
    state.set_field_value("locked", json!(true));
    state.set_field_value("shell", json!("/bin/zsh"));

    let payload = build_payload(&mut state, &schema());

    assert_eq!(payload, fields(json!({"locked": true, "shell": "/bin/zsh"})));
}

#[test]
fn payload_excludes_keys_read_only_in_given_schema() {
    let mut state = ReconciliationState::new(&bob(), schema());
    state.set_field_value("locked", json!(true));
    state.set_field_value("username", json!("robert"));

    // A stricter schema where `username` is read-only and `locked` unknown.
    let strict = FieldSchema::new(vec![
        FieldDescriptor::immutable("id"),
        FieldDescriptor::immutable("username"),
    ])
    .unwrap();
    let payload = build_payload(&mut state, &strict);

    assert!(payload.is_empty());
    assert_eq!(
        state.take_diagnostics(),
        vec![
            Diagnostic::UnknownField {
                key: "locked".into(),
                origin: FieldOrigin::Payload,
            },
            Diagnostic::ImmutableFieldWrite {
                key: "username".into(),
                origin: FieldOrigin::Payload,
            },
        ]
    );
}

#[test]
fn payload_write_to_read_only_field_is_an_error_diagnostic() {
    let diagnostic = Diagnostic::ImmutableFieldWrite {
        key: "id".into(),
        origin: FieldOrigin::Payload,
    };
    assert_eq!(diagnostic.severity(), recon_editor::Severity::Error);
}

#[test]
fn can_submit_tracks_pending_edits() {
    let mut state = ReconciliationState::new(&bob(), schema());
    assert!(!can_submit(&state));

    state.set_field_value("locked", json!(true));
    assert!(can_submit(&state));

    state.set_field_value("locked", json!(false));
    assert!(!can_submit(&state));
}

// ── submit ──────────────────────────────────────────────────────

#[tokio::test]
async fn submit_without_edits_is_rejected() {
    let mut state = ReconciliationState::new(&bob(), schema());
    let service = Arc::new(RecordingUpdateService::new());

    let result = submit(&mut state, &RecordId::from(1), service.clone(), |_| {});

    assert_eq!(result, Err(ReconcileError::NothingToSubmit));
    assert_eq!(state.take_diagnostics(), vec![Diagnostic::EmptySubmission]);
    assert!(state.last_submitted().is_none());
    tokio::task::yield_now().await;
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn submit_sends_payload_and_keeps_baseline() {
    let mut state = ReconciliationState::new(&bob(), schema());
    state.set_field_value("locked", json!(true));
    let service = Arc::new(RecordingUpdateService::new());
    let (tx, rx) = oneshot::channel::<SubmissionOutcome>();

    let submission = submit(&mut state, &RecordId::from(1), service.clone(), move |outcome| {
        let _ = tx.send(outcome);
    })
    .unwrap();

    assert_eq!(submission.seq, SubmissionSeq::FIRST);
    assert_eq!(submission.payload, fields(json!({"locked": true})));
    assert_eq!(state.baseline(), &bob());
    assert_eq!(state.local_edits(), &fields(json!({"locked": true})));
    assert_eq!(state.last_submitted(), Some(&submission.payload));

    let outcome = rx.await.unwrap();
    assert_eq!(outcome.seq, submission.seq);
    assert_eq!(outcome.record_id, RecordId::from(1));
    assert!(outcome.result.is_ok());
    assert_eq!(
        service.calls(),
        vec![UpdateCall {
            id: RecordId::from(1),
            payload: fields(json!({"locked": true})),
        }]
    );
}

#[tokio::test]
async fn failed_update_is_reported_to_callback() {
    let mut state = ReconciliationState::new(&bob(), schema());
    state.set_field_value("locked", json!(true));
    let service = Arc::new(RecordingUpdateService::new());
    service.fail_with(Some("permission denied"));
    let (tx, rx) = oneshot::channel::<SubmissionOutcome>();

    submit(&mut state, &RecordId::from(1), service, move |outcome| {
        let _ = tx.send(outcome);
    })
    .unwrap();

    let outcome = rx.await.unwrap();
    assert!(matches!(
        outcome.result,
        Err(EditorError::UpdateFailed(ref reason)) if reason == "permission denied"
    ));
    // Baseline only moves on echo, never on completion.
    assert_eq!(state.baseline(), &bob());
}

#[tokio::test]
async fn sequence_numbers_increase_per_submission() {
    let mut state = ReconciliationState::new(&bob(), schema());
    let service = Arc::new(RecordingUpdateService::new());

    state.set_field_value("locked", json!(true));
    let first = submit(&mut state, &RecordId::from(1), service.clone(), |_| {}).unwrap();
    state.set_field_value("shell", json!("/bin/zsh"));
    let second = submit(&mut state, &RecordId::from(1), service.clone(), |_| {}).unwrap();

    assert_eq!(second.seq, first.seq.next());
    assert_eq!(state.outstanding().len(), 2);
    assert_eq!(
        state.last_submitted(),
        Some(&fields(json!({"locked": true, "shell": "/bin/zsh"})))
    );

    service.wait_for_calls(2).await;
}
