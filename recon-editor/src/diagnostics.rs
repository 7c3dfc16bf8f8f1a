//! Diagnostic channel for non-fatal reconciliation problems.
//!
//! Nothing in the reconciliation core raises to the presentation layer.
//! Problems are logged through `tracing` and kept in a bounded
//! [`DiagnosticLog`] that callers may drain, while the offending input is
//! dropped.

use recon_types::SubmissionSeq;
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, warn};

/// Default number of diagnostics retained before the oldest are evicted.
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 64;

/// Where an offending field key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    /// A record snapshot delivered by the store.
    Snapshot,
    /// An operator input event.
    Input,
    /// An outgoing submission payload.
    Payload,
}

impl FieldOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Input => "input",
            Self::Payload => "payload",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    /// A defect: some code path broke an invariant and was stopped.
    Error,
}

/// A reportable, non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A key absent from the field schema.
    UnknownField { key: String, origin: FieldOrigin },
    /// A write to a field the server does not accept changes to.
    ImmutableFieldWrite { key: String, origin: FieldOrigin },
    /// Submit was invoked with no pending edits.
    EmptySubmission,
    /// Every pending edit was filtered out of the payload.
    NoValidFields,
    /// Operator input arrived while the session was in viewing mode.
    EditWhileViewing { key: String },
    /// The routing parameter did not resolve to a record.
    RecordMissing { route: String },
    /// The update service reported failure for a submission.
    SubmissionFailed { seq: SubmissionSeq, reason: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Self::ImmutableFieldWrite {
                origin: FieldOrigin::Payload,
                ..
            } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    fn emit(&self) {
        match self.severity() {
            Severity::Error => error!(diagnostic = ?self, "{}", self),
            Severity::Warning => warn!(diagnostic = ?self, "{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { key, origin } => {
                write!(f, "unknown field {key:?} in {} ignored", origin.as_str())
            }
            Self::ImmutableFieldWrite { key, origin } => {
                write!(f, "write to read-only field {key:?} in {} dropped", origin.as_str())
            }
            Self::EmptySubmission => f.write_str("submit with no pending edits ignored"),
            Self::NoValidFields => f.write_str("submit with no valid fields ignored"),
            Self::EditWhileViewing { key } => {
                write!(f, "input for {key:?} ignored while viewing")
            }
            Self::RecordMissing { route } => write!(f, "no record matches route {route:?}"),
            Self::SubmissionFailed { seq, reason } => {
                write!(f, "submission {seq} failed: {reason}")
            }
        }
    }
}

/// Bounded log of recent diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    evicted: u64,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticLog {
    /// Creates a log holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Logs `diagnostic` and retains it, evicting the oldest entry when full.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(diagnostic);
    }

    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries lost to eviction since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Moves the entries of `other` into this log without logging them again.
    pub fn absorb(&mut self, other: &mut DiagnosticLog) {
        for diagnostic in other.entries.drain(..) {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
                self.evicted += 1;
            }
            self.entries.push_back(diagnostic);
        }
        self.evicted += other.evicted;
        other.evicted = 0;
    }

    /// Removes and returns all retained entries, oldest first.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }
}
