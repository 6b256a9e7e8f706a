//! Supervision of the scanner and the command task.
//!
//! [`Orchestrator::run`] initializes the registry, then runs the
//! [`TagScanner`] and the [`CommandTask`] as two tasks on a
//! `tokio::task::LocalSet`, sharing one [`ModeController`] and the registry.
//! It waits for a shutdown signal or for a task to fail, then:
//!
//! 1. cancels both tasks through a `CancellationToken`,
//! 2. waits for each to finish (bounded by `shutdown_timeout`; a task that
//!    overruns is aborted),
//! 3. closes the registry.
//!
//! The command task ending because operator input closed is not a failure;
//! the scanner keeps running and enrollments are abandoned from then on.

use crate::commands::CommandTask;
use crate::error::{EngineError, Result};
use crate::events::ScanEvent;
use crate::operator::LabelRequester;
use crate::scanner::{DEFAULT_EVENT_CAPACITY, ScannerConfig, TagScanner};
use cardgate_core::constants::{DEFAULT_COMMAND_PAUSE_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS};
use cardgate_core::{ModeController, OperatingMode};
use cardgate_hardware::CardReader;
use cardgate_storage::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle, LocalSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Orchestrator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Pause the command task takes after each command.
    pub command_pause: Duration,

    /// How long each task gets to stop after cancellation.
    pub shutdown_timeout: Duration,

    /// Capacity of the scan event channel.
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            command_pause: Duration::from_millis(DEFAULT_COMMAND_PAUSE_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl OrchestratorConfig {
    /// Set the pause the command task takes after each command
    pub fn command_pause(mut self, pause: Duration) -> Self {
        self.command_pause = pause;
        self
    }

    /// Set how long each task may take to stop before it is aborted
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set how many scan events a slow subscriber may fall behind
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// How a supervised task ended.
#[derive(Debug)]
enum TaskTermination {
    Success,
    Error(EngineError),
    Panic,
    /// Did not stop within the shutdown timeout.
    Aborted,
}

/// Owns the reader, the registry and the mode cell, and runs the gate.
pub struct Orchestrator<R, G> {
    reader: R,
    registry: Arc<G>,
    mode: Arc<ModeController>,
    lines: mpsc::Receiver<String>,
    events: broadcast::Sender<ScanEvent>,
    scanner_config: ScannerConfig,
    config: OrchestratorConfig,
}

impl<R, G> Orchestrator<R, G>
where
    R: CardReader + 'static,
    G: Registry + 'static,
{
    /// Create an orchestrator reading operator lines from `lines`.
    pub fn new(reader: R, registry: G, lines: mpsc::Receiver<String>) -> Self {
        let config = OrchestratorConfig::default();
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            reader,
            registry: Arc::new(registry),
            mode: Arc::new(ModeController::default()),
            lines,
            events,
            scanner_config: ScannerConfig::default(),
            config,
        }
    }

    /// Set the configuration handed to the tag scanner.
    pub fn scanner_config(mut self, config: ScannerConfig) -> Self {
        self.scanner_config = config;
        self
    }

    /// Set the orchestrator configuration.
    ///
    /// Re-creates the event channel, so call it before [`subscribe`](Self::subscribe).
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        self.events = events;
        self.config = config;
        self
    }

    /// Start in `mode` instead of read-check.
    pub fn initial_mode(self, mode: OperatingMode) -> Self {
        self.mode.set(mode);
        self
    }

    /// Shared mode cell, for switching modes from outside the console.
    pub fn mode(&self) -> Arc<ModeController> {
        Arc::clone(&self.mode)
    }

    /// Shared handle on the registry; it is closed when `run` returns.
    pub fn registry(&self) -> Arc<G> {
        Arc::clone(&self.registry)
    }

    /// Receive every [`ScanEvent`] published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Run until `shutdown` completes or a task fails.
    ///
    /// # Errors
    ///
    /// Returns the registry's initialization error (the reader is released
    /// and nothing is started in that case), or the error of the task whose
    /// failure stopped the gate. A requested shutdown returns `Ok(())`.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let Self {
            mut reader,
            registry,
            mode,
            lines,
            events,
            scanner_config,
            config,
        } = self;

        if let Err(e) = registry.init().await {
            error!("Registry initialization failed: {}", e);
            if let Err(cleanup) = reader.cleanup().await {
                error!("Reader cleanup failed: {}", cleanup);
            }
            registry.close().await;
            return Err(e.into());
        }

        let (labels, label_requests) = LabelRequester::channel(1);
        let scanner = TagScanner::new(reader, Arc::clone(&registry), Arc::clone(&mode), labels)
            .with_config(scanner_config)
            .with_events(events);
        let commands =
            CommandTask::new(Arc::clone(&mode), lines, label_requests).pause(config.command_pause);

        let cancel = CancellationToken::new();
        let local = LocalSet::new();

        let outcome = local
            .run_until(supervise(scanner, commands, cancel, config, shutdown))
            .await;

        registry.close().await;
        info!("Registry closed");

        outcome
    }
}

async fn supervise<R, G>(
    scanner: TagScanner<R, G>,
    commands: CommandTask,
    cancel: CancellationToken,
    config: OrchestratorConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    R: CardReader + 'static,
    G: Registry + 'static,
{
    let mut scanner_task = tokio::task::spawn_local(scanner.run(cancel.child_token()));
    let mut command_task = tokio::task::spawn_local(commands.run(cancel.child_token()));
    tokio::pin!(shutdown);

    let mut scanner_end = None;
    let mut command_end = None;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            result = &mut scanner_task, if scanner_end.is_none() => {
                let end = classify("scanner", result);
                warn!("Scanner stopped on its own, shutting down");
                scanner_end = Some(end);
                break;
            }
            result = &mut command_task, if command_end.is_none() => {
                let end = classify("command", result);
                let failed = !matches!(end, TaskTermination::Success);
                command_end = Some(end);
                if failed {
                    break;
                }
            }
        }
    }

    cancel.cancel();

    let scanner_end = match scanner_end {
        Some(end) => end,
        None => stop("scanner", scanner_task, config.shutdown_timeout).await,
    };
    let command_end = match command_end {
        Some(end) => end,
        None => stop("command", command_task, config.shutdown_timeout).await,
    };

    // The first failure wins; a scanner failure is reported before a command one
    match (scanner_end, command_end) {
        (TaskTermination::Error(e), _) | (_, TaskTermination::Error(e)) => Err(e),
        (TaskTermination::Panic, _) => Err(EngineError::TaskPanicked { task: "scanner" }),
        (_, TaskTermination::Panic) => Err(EngineError::TaskPanicked { task: "command" }),
        _ => Ok(()),
    }
}

/// Wait for a cancelled task, aborting it if it overruns `timeout`.
async fn stop(
    task: &'static str,
    mut handle: JoinHandle<Result<()>>,
    timeout: Duration,
) -> TaskTermination {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(result) => classify(task, result),
        Err(_) => {
            warn!("{} task did not stop within {:?}, aborting", task, timeout);
            handle.abort();
            TaskTermination::Aborted
        }
    }
}

fn classify(task: &'static str, result: std::result::Result<Result<()>, JoinError>) -> TaskTermination {
    match result {
        Ok(Ok(())) => {
            debug!("{} task finished", task);
            TaskTermination::Success
        }
        Ok(Err(e)) => {
            error!("{} task failed: {}", task, e);
            TaskTermination::Error(e)
        }
        Err(e) if e.is_cancelled() => TaskTermination::Aborted,
        Err(_) => {
            error!("{} task panicked", task);
            TaskTermination::Panic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_config_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.command_pause, Duration::from_millis(100));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_orchestrator_config_builder() {
        let config = OrchestratorConfig::default()
            .command_pause(Duration::from_millis(10))
            .shutdown_timeout(Duration::from_secs(1))
            .event_capacity(8);
        assert_eq!(config.command_pause, Duration::from_millis(10));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.event_capacity, 8);
    }
}
