pub mod command;
pub mod constants;
pub mod error;
pub mod mode;
pub mod retry;
pub mod types;

pub use command::Command;
pub use error::{Error, Result, RetryError};
pub use mode::ModeController;
pub use retry::RetryPolicy;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
