//! Operator command task.
//!
//! Reads operator lines and switches the shared [`ModeController`]:
//! `enrollmode` selects enrollment, `admode` selects access checking and
//! anything else is logged as an unknown command. While the scanner waits
//! for a label, the next line is routed to it instead of being parsed.
//!
//! The task ends when cancelled or when the operator input closes. Once it
//! is gone, label requests fail and the scanner abandons enrollments.

use crate::error::Result;
use crate::operator::{COMMAND_PROMPT, LABEL_PROMPT, LabelRequest};
use cardgate_core::constants::DEFAULT_COMMAND_PAUSE_MS;
use cardgate_core::{Command, ModeController};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CommandTask {
    mode: Arc<ModeController>,
    lines: mpsc::Receiver<String>,
    label_requests: mpsc::Receiver<LabelRequest>,
    pause: Duration,
    prompts: Box<dyn Write + Send>,
}

impl CommandTask {
    pub fn new(
        mode: Arc<ModeController>,
        lines: mpsc::Receiver<String>,
        label_requests: mpsc::Receiver<LabelRequest>,
    ) -> Self {
        Self {
            mode,
            lines,
            label_requests,
            pause: Duration::from_millis(DEFAULT_COMMAND_PAUSE_MS),
            prompts: Box::new(std::io::stdout()),
        }
    }

    /// Pause after each processed command.
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Write prompts to `out` instead of stdout.
    pub fn prompt_to(mut self, out: impl Write + Send + 'static) -> Self {
        self.prompts = Box::new(out);
        self
    }

    /// Serve operator input until cancelled or the input closes.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        loop {
            self.show_prompt(COMMAND_PROMPT);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(request) = self.label_requests.recv() => {
                    if !self.serve_label(request, &cancel).await {
                        break;
                    }
                    continue;
                }
                line = self.lines.recv() => match line {
                    Some(line) => self.handle_line(&line),
                    None => {
                        info!("Operator input closed");
                        break;
                    }
                },
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.pause) => {}
            }
        }

        debug!("Command task stopped");
        Ok(())
    }

    fn show_prompt(&mut self, prompt: &str) {
        // A closed terminal only loses the prompt, input handling goes on
        let _ = write!(self.prompts, "{prompt}");
        let _ = self.prompts.flush();
    }

    fn handle_line(&self, line: &str) {
        match Command::parse(line) {
            Command::SetMode(mode) => {
                let previous = self.mode.set(mode);
                if previous == mode {
                    info!("Already in {} mode", mode);
                } else {
                    info!("Switched to {} mode", mode);
                }
            }
            Command::Unknown(command) => warn!("Unknown command: {:?}", command),
        }
    }

    /// Route the next operator line to a label request.
    ///
    /// Returns `false` when the operator input closed.
    async fn serve_label(&mut self, request: LabelRequest, cancel: &CancellationToken) -> bool {
        self.show_prompt(LABEL_PROMPT);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            line = self.lines.recv() => match line {
                Some(line) => {
                    if !request.respond(line) {
                        debug!("Label arrived after the scanner stopped waiting");
                    }
                    true
                }
                None => {
                    warn!("Operator input closed while waiting for a label");
                    false
                }
            },
        }
    }
}
