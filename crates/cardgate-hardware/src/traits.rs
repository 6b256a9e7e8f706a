//! Card reader trait definition.
//!
//! This module defines the capability set the gate consumes from a
//! contactless reader: the request and anti-collision phases of a poll,
//! tag selection, sector authentication, block writes, ending the
//! authenticated session, and releasing the reader.
//!
//! All methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro. A driver whose
//! primitives block should offload them (for example with
//! `tokio::task::spawn_blocking`) inside its implementation so callers never
//! stall the scheduler.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{BlockData, KeyType, MifareKey, TagType};

/// Contactless card reader abstraction.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the
/// [`AnyCardReader`](crate::devices::AnyCardReader) enum wrapper when the
/// concrete reader is chosen at runtime.
///
/// # Examples
///
/// ```no_run
/// use cardgate_hardware::traits::CardReader;
/// use cardgate_hardware::types::{BlockData, KeyType, MifareKey};
/// use cardgate_hardware::error::Result;
///
/// async fn write_marker<R: CardReader>(reader: &mut R) -> Result<()> {
///     let uid = reader.poll_for_tag().await?;
///     reader.select_tag(&uid).await?;
///     reader
///         .authenticate(KeyType::KeyA, 8, &MifareKey::DEFAULT, &uid)
///         .await?;
///     reader.write_block(8, &BlockData::marker()).await?;
///     reader.stop_crypto().await
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Prepare the reader for use.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the reader cannot be brought up.
    /// The scanner treats this as unrecoverable.
    async fn initialize(&mut self) -> Result<()>;

    /// Ask for a tag in the field (REQA).
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` with the reader status if no tag answered or
    /// the transfer failed.
    async fn request(&mut self) -> Result<TagType>;

    /// Run anti-collision and return the raw UID of the answering tag.
    ///
    /// # Errors
    ///
    /// Returns `AntiCollisionFailed` with the reader status on failure.
    async fn anticoll(&mut self) -> Result<Vec<u8>>;

    /// Select the tag with the given UID for subsequent operations.
    async fn select_tag(&mut self, uid: &[u8]) -> Result<()>;

    /// Authenticate the sector that contains `block`.
    async fn authenticate(
        &mut self,
        key_type: KeyType,
        block: u8,
        key: &MifareKey,
        uid: &[u8],
    ) -> Result<()>;

    /// Write 16 bytes to `block`. The block's sector must be authenticated.
    async fn write_block(&mut self, block: u8, data: &BlockData) -> Result<()>;

    /// End the authenticated session.
    async fn stop_crypto(&mut self) -> Result<()>;

    /// Release the reader. Called once when the owner is done with it.
    async fn cleanup(&mut self) -> Result<()>;

    /// One poll: request followed by anti-collision.
    ///
    /// A failure of either phase is returned as is; see
    /// [`HardwareError::is_poll_failure`](crate::HardwareError::is_poll_failure).
    async fn poll_for_tag(&mut self) -> Result<Vec<u8>> {
        self.request().await?;
        self.anticoll().await
    }
}
