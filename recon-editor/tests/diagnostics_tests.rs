//! Tests for diagnostics.rs: severities, messages and the bounded log.

use recon_editor::{Diagnostic, DiagnosticLog, FieldOrigin, Severity};
use recon_types::SubmissionSeq;

fn unknown(key: &str) -> Diagnostic {
    Diagnostic::UnknownField {
        key: key.into(),
        origin: FieldOrigin::Snapshot,
    }
}

#[test]
fn only_payload_writes_to_read_only_fields_are_errors() {
    let input = Diagnostic::ImmutableFieldWrite {
        key: "id".into(),
        origin: FieldOrigin::Input,
    };
    let payload = Diagnostic::ImmutableFieldWrite {
        key: "id".into(),
        origin: FieldOrigin::Payload,
    };

    assert_eq!(input.severity(), Severity::Warning);
    assert_eq!(payload.severity(), Severity::Error);
    assert_eq!(Diagnostic::EmptySubmission.severity(), Severity::Warning);
}

#[test]
fn display_names_key_and_origin() {
    assert_eq!(
        unknown("uid").to_string(),
        "unknown field \"uid\" in snapshot ignored"
    );
    assert_eq!(
        Diagnostic::SubmissionFailed {
            seq: SubmissionSeq::new(3),
            reason: "timeout".into(),
        }
        .to_string(),
        "submission #3 failed: timeout"
    );
    assert_eq!(
        Diagnostic::RecordMissing {
            route: "bob".into()
        }
        .to_string(),
        "no record matches route \"bob\""
    );
}

#[test]
fn log_retains_in_order_and_drains() {
    let mut log = DiagnosticLog::default();
    log.report(unknown("a"));
    log.report(Diagnostic::EmptySubmission);

    assert_eq!(log.len(), 2);
    assert_eq!(
        log.entries().cloned().collect::<Vec<_>>(),
        vec![unknown("a"), Diagnostic::EmptySubmission]
    );
    assert_eq!(log.drain(), vec![unknown("a"), Diagnostic::EmptySubmission]);
    assert!(log.is_empty());
}

#[test]
fn log_evicts_oldest_when_full() {
    let mut log = DiagnosticLog::with_capacity(2);
    log.report(unknown("a"));
    log.report(unknown("b"));
    log.report(unknown("c"));

    assert_eq!(log.drain(), vec![unknown("b"), unknown("c")]);
    assert_eq!(log.evicted(), 1);
}

#[test]
fn zero_capacity_still_keeps_latest() {
    let mut log = DiagnosticLog::with_capacity(0);
    log.report(unknown("a"));
    log.report(unknown("b"));

    assert_eq!(log.drain(), vec![unknown("b")]);
}

#[test]
fn absorb_moves_entries_and_eviction_count() {
    let mut session = DiagnosticLog::with_capacity(2);
    session.report(unknown("a"));

    let mut state = DiagnosticLog::with_capacity(1);
    state.report(unknown("b"));
    state.report(unknown("c"));

    session.absorb(&mut state);

    assert!(state.is_empty());
    assert_eq!(state.evicted(), 0);
    assert_eq!(session.evicted(), 1);
    assert_eq!(session.drain(), vec![unknown("a"), unknown("c")]);
}
