//! Card reader abstraction layer for the card gate.
//!
//! This crate provides the trait-based abstraction for the contactless
//! (MIFARE Classic) reader the gate polls, together with the value types
//! the reader primitives exchange and a scriptable mock reader. The reader
//! driver itself (SPI transport, anti-collision cascade, CRYPTO1) lives
//! behind the [`CardReader`] trait and is not part of this crate.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All reader primitives are `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyCardReader`] wraps concrete readers for
//!   runtime selection, since async traits are not object-safe.
//! - **Error-aware**: Request and anti-collision failures are distinct
//!   [`HardwareError`] variants that callers can collapse into one "poll
//!   failed" condition with [`HardwareError::is_poll_failure`].
//!
//! # Reader primitives
//!
//! ```no_run
//! use cardgate_hardware::traits::CardReader;
//! use cardgate_hardware::types::{BlockData, KeyType, MifareKey};
//! use cardgate_hardware::error::Result;
//!
//! async fn stamp<R: CardReader>(reader: &mut R) -> Result<Vec<u8>> {
//!     let uid = reader.poll_for_tag().await?;
//!     reader.select_tag(&uid).await?;
//!     reader.authenticate(KeyType::KeyA, 8, &MifareKey::DEFAULT, &uid).await?;
//!     reader.write_block(8, &BlockData::marker()).await?;
//!     reader.stop_crypto().await?;
//!     Ok(uid)
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`MockReader`](mock::MockReader) simulates tags entering and leaving the
//! field, keeps per-tag block memory (so a rewritten sector trailer changes
//! the sector key), injects faults per operation and counts calls.
//!
//! [`CardReader`]: traits::CardReader
//! [`AnyCardReader`]: devices::AnyCardReader

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyCardReader;
pub use error::{HardwareError, Result};
pub use traits::CardReader;
pub use types::{AccessBits, BlockData, KeyType, MifareKey, SectorTrailer, TagType};
