//! Core constants for the card gate.
//!
//! This module centralizes the values shared by the scanner, the hardware
//! layer and the binary: retry defaults, polling cadence, MIFARE block
//! layout and the well-known factory key.
//!
//! # Usage
//!
//! ```
//! use cardgate_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_MAX_RETRIES, 3);
//! assert_eq!(Duration::from_millis(DEFAULT_BASE_DELAY_MS), Duration::from_millis(500));
//! assert_eq!(MARKER_TEXT, "Registered");
//! ```

// ============================================================================
// Retry
// ============================================================================

/// Default number of retries after the first failed attempt.
///
/// With the default of 3 an operation is attempted at most 4 times.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff, in milliseconds.
///
/// The n-th retry waits `base * 2^(n-1)`: 500ms, 1000ms, 2000ms.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

// ============================================================================
// Polling
// ============================================================================

/// Fixed pause between poll cycles, in milliseconds.
///
/// This is the polling cadence, not a backoff.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Pause after each processed operator command, in milliseconds.
pub const DEFAULT_COMMAND_PAUSE_MS: u64 = 100;

/// Time the orchestrator waits for a cancelled task before aborting it, in milliseconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// UID canonicalization
// ============================================================================

/// Separator used when rendering a raw UID as a registry key.
///
/// # Examples
///
/// ```
/// use cardgate_core::constants::UID_DELIMITER;
///
/// let key = [4u8, 171, 205, 239]
///     .iter()
///     .map(|b| b.to_string())
///     .collect::<Vec<_>>()
///     .join(UID_DELIMITER);
/// assert_eq!(key, "4-171-205-239");
/// ```
pub const UID_DELIMITER: &str = "-";

// ============================================================================
// MIFARE Classic layout
// ============================================================================

/// Size of a MIFARE Classic data block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of a MIFARE Classic sector key in bytes.
pub const KEY_SIZE: usize = 6;

/// Size of the access-condition field of a sector trailer in bytes.
pub const ACCESS_BITS_SIZE: usize = 4;

/// Number of blocks per sector in the first 32 sectors.
pub const BLOCKS_PER_SECTOR: u8 = 4;

/// Block that receives the enrollment marker.
pub const DEFAULT_MARKER_BLOCK: u8 = 8;

/// Sector trailer of sector 1, rewritten when provisioning a custom key.
pub const DEFAULT_SECTOR_TRAILER_BLOCK: u8 = 7;

/// Text written to an enrolled card, left-justified and zero-padded.
pub const MARKER_TEXT: &str = "Registered";

/// Factory default key shipped on blank MIFARE Classic cards.
pub const DEFAULT_KEY: [u8; KEY_SIZE] = [0xFF; KEY_SIZE];

/// Transport access bits (`FF 07 80 69`): keys readable only by key A holder.
pub const DEFAULT_ACCESS_BITS: [u8; ACCESS_BITS_SIZE] = [0xFF, 0x07, 0x80, 0x69];

// ============================================================================
// Operator commands
// ============================================================================

/// Operator command that switches the gate to enrollment mode.
pub const COMMAND_ENROLL_MODE: &str = "enrollmode";

/// Operator command that switches the gate back to access-check mode.
pub const COMMAND_ACCESS_MODE: &str = "admode";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_trailer_layout_fits_block() {
        assert_eq!(KEY_SIZE + ACCESS_BITS_SIZE + KEY_SIZE, BLOCK_SIZE);
    }

    #[test]
    fn test_marker_fits_block() {
        assert!(MARKER_TEXT.len() <= BLOCK_SIZE);
    }

    #[test]
    fn test_default_trailer_is_last_block_of_sector() {
        assert_eq!(DEFAULT_SECTOR_TRAILER_BLOCK % BLOCKS_PER_SECTOR, BLOCKS_PER_SECTOR - 1);
        assert_ne!(DEFAULT_MARKER_BLOCK % BLOCKS_PER_SECTOR, BLOCKS_PER_SECTOR - 1);
    }
}
