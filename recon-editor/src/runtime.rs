//! Session event loop.
//!
//! A session is driven by a single task draining one inbox. Operator
//! commands, store notifications, update completions and option results
//! all arrive as [`SessionCommand`]s and are applied strictly in order, so
//! the reconciliation state needs no locking.

use recon_types::FieldValue;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::error::{EditorError, EditorResult, ReconcileResult};
use crate::gate::SubmissionOutcome;
use crate::session::{Collaborators, EditorMode, RecordSession, SessionConfig, SessionView};
use crate::state::{EditOutcome, Submission};

/// Event delivered to a session's inbox.
#[derive(Debug)]
pub enum SessionCommand {
    /// Operator changed a field.
    Input {
        key: String,
        value: FieldValue,
        reply: Option<oneshot::Sender<EditOutcome>>,
    },
    /// Operator dropped the edit for one field.
    Revert { key: String },
    /// Operator asked to send pending edits.
    Submit {
        reply: oneshot::Sender<ReconcileResult<Submission>>,
    },
    SwitchMode(EditorMode),
    /// Routing parameter changed.
    Route(String),
    /// The record store reported a change.
    StoreChanged,
    /// An update call finished.
    SubmissionSettled(SubmissionOutcome),
    /// The option fetch finished.
    OptionsLoaded(EditorResult<Vec<String>>),
    /// Presentation snapshot query.
    View(oneshot::Sender<SessionView>),
    /// Drain accumulated diagnostics.
    Diagnostics(oneshot::Sender<Vec<Diagnostic>>),
    /// Tear the session down.
    Close,
}

/// Handle to a running session.
///
/// Dropping the handle closes the session.
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

/// Mounts a session for `route` and runs its event loop on a tokio task.
pub fn spawn_session(
    config: SessionConfig,
    collaborators: Collaborators,
    route: impl Into<String>,
) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = RecordSession::mount(config, collaborators, route, tx.clone());
    let task = tokio::spawn(run_event_loop(session, rx));
    SessionHandle {
        tx,
        task: Some(task),
    }
}

async fn run_event_loop(
    mut session: RecordSession,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Input { key, value, reply } => {
                let outcome = session.set_field_value(&key, value);
                if let Some(reply) = reply {
                    let _ = reply.send(outcome);
                }
            }
            SessionCommand::Revert { key } => {
                session.revert_field(&key);
            }
            SessionCommand::Submit { reply } => {
                let _ = reply.send(session.submit());
            }
            SessionCommand::SwitchMode(mode) => session.switch_mode(mode),
            SessionCommand::Route(route) => session.set_route(route),
            SessionCommand::StoreChanged => session.handle_store_changed(),
            SessionCommand::SubmissionSettled(outcome) => {
                session.handle_submission_settled(outcome);
            }
            SessionCommand::OptionsLoaded(result) => session.handle_options_loaded(result),
            SessionCommand::View(reply) => {
                let _ = reply.send(session.view());
            }
            SessionCommand::Diagnostics(reply) => {
                let _ = reply.send(session.take_diagnostics());
            }
            SessionCommand::Close => break,
        }
    }
    session.close();
    debug!(session = %session.id(), "event loop stopped");
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> EditorResult<()> {
        self.tx
            .send(command)
            .map_err(|_| EditorError::SessionClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> EditorResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx))?;
        reply_rx.await.map_err(|_| EditorError::SessionClosed)
    }

    /// Applies operator input and reports what it did.
    pub async fn input(
        &self,
        key: impl Into<String>,
        value: FieldValue,
    ) -> EditorResult<EditOutcome> {
        let key = key.into();
        self.request(|reply| SessionCommand::Input {
            key,
            value,
            reply: Some(reply),
        })
        .await
    }

    pub fn revert(&self, key: impl Into<String>) -> EditorResult<()> {
        self.send(SessionCommand::Revert { key: key.into() })
    }

    /// Sends pending edits. Resolves once the submission is accepted
    /// locally; the update call itself completes in the background.
    pub async fn submit(&self) -> EditorResult<Submission> {
        let result = self.request(|reply| SessionCommand::Submit { reply }).await?;
        Ok(result?)
    }

    pub fn switch_mode(&self, mode: EditorMode) -> EditorResult<()> {
        self.send(SessionCommand::SwitchMode(mode))
    }

    pub fn route(&self, route: impl Into<String>) -> EditorResult<()> {
        self.send(SessionCommand::Route(route.into()))
    }

    /// Current presentation snapshot. Every command sent before this call
    /// has been applied.
    pub async fn view(&self) -> EditorResult<SessionView> {
        self.request(SessionCommand::View).await
    }

    pub async fn take_diagnostics(&self) -> EditorResult<Vec<Diagnostic>> {
        self.request(SessionCommand::Diagnostics).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Stops the event loop and waits for it to unsubscribe from the store.
    pub async fn close(mut self) -> EditorResult<()> {
        let _ = self.tx.send(SessionCommand::Close);
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| EditorError::Task(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(SessionCommand::Close);
        }
    }
}
