//! Error types for card reader operations.
//!
//! This module defines error types specific to the reader primitives,
//! covering the request and anti-collision phases of a poll, authentication,
//! block writes, and reader setup and teardown.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Status code reported by a reader when no tag answered.
pub const STATUS_NO_TAG: u8 = 1;

/// Status code reported by a reader for a generic transfer error.
pub const STATUS_ERROR: u8 = 2;

/// Errors that can occur during card reader operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The request (REQA) phase of a poll failed.
    #[error("RFID request error: status {code}")]
    RequestFailed { code: u8 },

    /// The anti-collision phase of a poll failed.
    #[error("RFID anticoll error: status {code}")]
    AntiCollisionFailed { code: u8 },

    /// Selecting the tag failed.
    #[error("Select failed: {message}")]
    SelectFailed { message: String },

    /// Authentication of a block was rejected.
    #[error("Authentication failed for block {block}")]
    AuthenticationFailed { block: u8 },

    /// Writing a block failed.
    #[error("Write failed for block {block}: {message}")]
    WriteFailed { block: u8, message: String },

    /// Block access attempted without authenticating its sector first.
    #[error("Block {block} is not authenticated")]
    NotAuthenticated { block: u8 },

    /// Ending the authenticated session failed.
    #[error("Stop crypto failed: {message}")]
    CryptoStopFailed { message: String },

    /// Releasing the reader failed.
    #[error("Cleanup failed: {message}")]
    CleanupFailed { message: String },

    /// Reader initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// A key or access-bits string did not parse.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl HardwareError {
    /// Create a new request-phase error.
    pub fn request(code: u8) -> Self {
        Self::RequestFailed { code }
    }

    /// Create a new anti-collision-phase error.
    pub fn anticoll(code: u8) -> Self {
        Self::AntiCollisionFailed { code }
    }

    /// Create a new select error.
    pub fn select(message: impl Into<String>) -> Self {
        Self::SelectFailed {
            message: message.into(),
        }
    }

    /// Create a new authentication error.
    pub fn authentication(block: u8) -> Self {
        Self::AuthenticationFailed { block }
    }

    /// Create a new write error.
    pub fn write(block: u8, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            block,
            message: message.into(),
        }
    }

    /// Create a new stop-crypto error.
    pub fn crypto_stop(message: impl Into<String>) -> Self {
        Self::CryptoStopFailed {
            message: message.into(),
        }
    }

    /// Create a new cleanup error.
    pub fn cleanup(message: impl Into<String>) -> Self {
        Self::CleanupFailed {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Whether this error came from either phase of a poll.
    ///
    /// Both phases collapse into one "poll failed" condition for the scanner.
    pub fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            Self::RequestFailed { .. } | Self::AntiCollisionFailed { .. }
        )
    }
}
