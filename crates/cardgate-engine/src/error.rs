use cardgate_core::RetryError;
use cardgate_hardware::HardwareError;
use cardgate_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the scanner, the command task and the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The reader could not be brought up. Fatal for the scanner.
    #[error("Reader initialization failed: {0}")]
    ReaderInit(#[source] HardwareError),

    /// A reader primitive kept failing after all retries.
    #[error(transparent)]
    Reader(#[from] RetryError<HardwareError>),

    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] cardgate_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// A supervised task panicked.
    #[error("{task} task panicked")]
    TaskPanicked { task: &'static str },
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
