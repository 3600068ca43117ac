//! Divergence prompts as awaited futures
//!
//! When a load discovers the live file diverged from the snapshot, the
//! worker posts a question on the event stream and suspends on a oneshot
//! until the host answers. The worker races the answer against its
//! cancellation token, so a superseded job never blocks on a dialog.

use tokio::sync::oneshot;

use super::job::JobTicket;
use crate::error::{Result, SeshatError};

/// What the host is being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// The live file changed outside the editor; confirming re-reads it,
    /// declining keeps the snapshot buffer
    ReloadChangedFile,

    /// The live file was deleted while a snapshot exists; declining
    /// discards the snapshot pair
    KeepDeletedFile,
}

/// The host's answer to a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Confirmed,
    Declined,
}

/// A question in flight, settled exactly once
#[derive(Debug)]
pub struct PromptRequest {
    /// Display name of the document the question is about
    pub document: String,

    /// Question kind
    pub kind: PromptKind,

    responder: oneshot::Sender<PromptChoice>,
}

impl PromptRequest {
    /// Build a request and the receiver its worker will suspend on
    pub fn new(document: impl Into<String>, kind: PromptKind) -> (Self, oneshot::Receiver<PromptChoice>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                document: document.into(),
                kind,
                responder: tx,
            },
            rx,
        )
    }

    /// Settle the prompt. A worker that was cancelled while waiting has
    /// dropped its receiver; that answer is simply discarded.
    pub fn respond(self, choice: PromptChoice) {
        let _ = self.responder.send(choice);
    }
}

/// Suspend on the host's answer, racing the job's cancellation token.
/// A dropped responder counts as cancellation, not as an answer.
pub async fn await_choice(
    rx: oneshot::Receiver<PromptChoice>,
    ticket: &JobTicket,
) -> Result<PromptChoice> {
    tokio::select! {
        _ = ticket.cancelled() => Err(SeshatError::Cancelled),
        answer = rx => answer.map_err(|_| SeshatError::Cancelled),
    }
}
