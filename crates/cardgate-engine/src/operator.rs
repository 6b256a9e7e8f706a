//! Routing of operator input between the command task and the scanner.
//!
//! There is one operator line source. It normally carries mode commands to
//! the command task. When the scanner needs a label for a new tag it sends a
//! [`LabelRequest`] to the command task, which hands the next operator line
//! back through the request's reply channel instead of parsing it as a
//! command.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Prompt shown before each operator command.
pub const COMMAND_PROMPT: &str = "Command ('enrollmode' or 'admode'): ";

/// Prompt shown to the operator when a label is needed.
pub const LABEL_PROMPT: &str = "Enter a label for the new tag: ";

/// A pending request for one operator line.
#[derive(Debug)]
pub struct LabelRequest {
    reply: oneshot::Sender<String>,
}

impl LabelRequest {
    /// Answer the request. Returns `false` if the requester stopped waiting.
    pub fn respond(self, line: String) -> bool {
        self.reply.send(line).is_ok()
    }
}

/// Scanner-side handle for asking the operator for a label.
#[derive(Debug, Clone)]
pub struct LabelRequester {
    tx: mpsc::Sender<LabelRequest>,
}

impl LabelRequester {
    /// Create a requester and the receiving end the command task serves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LabelRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Ask for one line of operator input.
    ///
    /// Returns `None` when the command task is gone or dropped the request.
    pub async fn request(&self) -> Option<String> {
        let (reply, rx) = oneshot::channel();

        if self.tx.send(LabelRequest { reply }).await.is_err() {
            debug!("Label requested but no operator console is attached");
            return None;
        }

        rx.await.ok()
    }
}
