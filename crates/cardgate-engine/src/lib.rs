//! Card gate engine: the polling, dispatch and supervision core.
//!
//! This crate ties a [`CardReader`](cardgate_hardware::CardReader) and a
//! [`Registry`](cardgate_storage::Registry) together:
//!
//! - [`TagScanner`] polls the reader, ignores repeated reads of a resting
//!   tag and dispatches new presentations on the current mode (check access
//!   or enroll).
//! - [`CommandTask`] reads operator lines, switches the mode and routes label
//!   input to the scanner during enrollment.
//! - [`Orchestrator`] runs both as cooperative tasks on one thread, and on
//!   shutdown cancels them, waits for them and closes the registry.
//! - [`provision`] holds one-shot tools for re-keying a sector and writing
//!   text to a block.
//!
//! # Examples
//!
//! ```no_run
//! use cardgate_engine::Orchestrator;
//! use cardgate_hardware::mock::MockReader;
//! use cardgate_storage::MemoryRegistry;
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cardgate_engine::Result<()> {
//! let (reader, handle) = MockReader::new();
//! let (_lines_tx, lines) = mpsc::channel(16);
//!
//! let orchestrator = Orchestrator::new(reader, MemoryRegistry::new(), lines);
//! let mut events = orchestrator.subscribe();
//!
//! handle.present_tag(vec![4, 171, 205, 239]);
//! orchestrator
//!     .run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # let _ = events.try_recv();
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod error;
pub mod events;
pub mod operator;
pub mod orchestrator;
pub mod provision;
pub mod scanner;

pub use commands::CommandTask;
pub use error::{EngineError, Result};
pub use events::{AbandonReason, ScanEvent};
pub use operator::{COMMAND_PROMPT, LABEL_PROMPT, LabelRequest, LabelRequester};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use provision::{KeyProvisioning, ToolConfig, provision_key, wait_for_tag, write_text};
pub use scanner::{AbsencePolicy, ScannerConfig, TagScanner};
