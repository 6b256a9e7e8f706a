//! Shared operating-mode cell.
//!
//! [`ModeController`] holds the single [`OperatingMode`] value shared by the
//! operator command task (the only writer) and the tag scanner (reader). The
//! value lives in an atomic, so the latest write is visible to the next read
//! without locking. No ordering is promised between a mode change and a
//! detection already in flight.
//!
//! # Examples
//!
//! ```
//! use cardgate_core::{ModeController, OperatingMode};
//! use std::sync::Arc;
//!
//! let mode = Arc::new(ModeController::default());
//! assert_eq!(mode.get(), OperatingMode::ReadCheck);
//!
//! let writer = Arc::clone(&mode);
//! writer.set(OperatingMode::Enroll);
//! assert_eq!(mode.get(), OperatingMode::Enroll);
//! ```

use crate::types::OperatingMode;
use std::sync::atomic::{AtomicU8, Ordering};

/// Thread-safe holder of the current [`OperatingMode`].
#[derive(Debug)]
pub struct ModeController {
    mode: AtomicU8,
}

impl ModeController {
    /// Create a controller starting in `initial`.
    pub fn new(initial: OperatingMode) -> Self {
        Self {
            mode: AtomicU8::new(initial.to_u8()),
        }
    }

    /// Current mode.
    pub fn get(&self) -> OperatingMode {
        OperatingMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Replace the current mode, returning the previous one.
    pub fn set(&self, mode: OperatingMode) -> OperatingMode {
        OperatingMode::from_u8(self.mode.swap(mode.to_u8(), Ordering::AcqRel))
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(OperatingMode::default())
    }
}
