//! One-shot card tools: wait for a tag, rewrite a sector key, write text.
//!
//! Each tool takes ownership of the reader, initializes it, does its work and
//! releases it exactly once on every exit path, like the scanner does.
//! Reader primitives go through the configured [`RetryPolicy`].

use crate::error::{EngineError, Result};
use cardgate_core::constants::{
    DEFAULT_MARKER_BLOCK, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SECTOR_TRAILER_BLOCK,
};
use cardgate_core::{CanonicalUid, RetryPolicy};
use cardgate_hardware::types::is_sector_trailer;
use cardgate_hardware::{AccessBits, BlockData, CardReader, KeyType, MifareKey, SectorTrailer};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default block for [`write_text`].
pub const DEFAULT_TEXT_BLOCK: u8 = DEFAULT_MARKER_BLOCK;

/// Poll until a tag answers request and anti-collision.
///
/// # Errors
///
/// Returns `EngineError::Cancelled` if `cancel` fires first.
pub async fn wait_for_tag<R: CardReader>(
    reader: &mut R,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    info!("Waiting for a tag...");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            polled = reader.poll_for_tag() => match polled {
                Ok(uid) => return Ok(uid),
                Err(e) if e.is_poll_failure() => {}
                Err(e) => debug!("Poll error while waiting for a tag: {}", e),
            },
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}

/// Settings shared by the one-shot tools.
#[derive(Debug, Clone, Copy)]
pub struct ToolConfig {
    /// Pause between polls while waiting for a tag.
    pub poll_interval: Duration,

    /// Key used to authenticate the target sector.
    pub key: MifareKey,

    /// Whether `key` is key A or key B.
    pub key_type: KeyType,

    /// Retry policy applied to each reader primitive.
    pub retry: RetryPolicy,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            key: MifareKey::DEFAULT,
            key_type: KeyType::KeyA,
            retry: RetryPolicy::default(),
        }
    }
}

impl ToolConfig {
    /// Set the pause between polls while waiting for a tag
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the key currently protecting the target sector
    pub fn key(mut self, key: MifareKey) -> Self {
        self.key = key;
        self
    }

    /// Set whether the key is key A or key B
    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Set the retry policy applied to each reader primitive
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Sector key rewrite request.
#[derive(Debug, Clone, Copy)]
pub struct KeyProvisioning {
    /// Trailer block of the sector to re-key.
    pub trailer_block: u8,

    /// New key A.
    pub new_key: MifareKey,

    /// Access conditions written between the two keys.
    pub access_bits: AccessBits,

    /// New key B; defaults to the new key A.
    pub key_b: Option<MifareKey>,
}

impl KeyProvisioning {
    /// Re-key the default trailer (block 7) with `new_key` as key A and B.
    pub fn new(new_key: MifareKey) -> Self {
        Self {
            trailer_block: DEFAULT_SECTOR_TRAILER_BLOCK,
            new_key,
            access_bits: AccessBits::default(),
            key_b: None,
        }
    }

    /// Set the trailer block of the sector to re-key
    pub fn trailer_block(mut self, block: u8) -> Self {
        self.trailer_block = block;
        self
    }

    /// Set the access conditions to write
    pub fn access_bits(mut self, access_bits: AccessBits) -> Self {
        self.access_bits = access_bits;
        self
    }

    /// Set a key B different from the new key A
    pub fn key_b(mut self, key_b: MifareKey) -> Self {
        self.key_b = Some(key_b);
        self
    }

    /// Trailer block contents: `new key (6) ++ access bits (4) ++ key B (6)`.
    pub fn trailer(&self) -> SectorTrailer {
        SectorTrailer::with_key(self.new_key)
            .access_bits(self.access_bits)
            .key_b(self.key_b.unwrap_or(self.new_key))
    }
}

/// Wait for a tag and rewrite one sector trailer with a new key.
///
/// Returns the canonical UID of the re-keyed tag.
pub async fn provision_key<R: CardReader>(
    reader: R,
    tool: &ToolConfig,
    request: &KeyProvisioning,
    cancel: &CancellationToken,
) -> Result<CanonicalUid> {
    if !is_sector_trailer(request.trailer_block) {
        return Err(EngineError::config(format!(
            "block {} is not a sector trailer",
            request.trailer_block
        )));
    }

    let trailer = request.trailer().to_block();
    let uid = with_reader(reader, async |reader| {
        let raw = wait_for_tag(reader, tool.poll_interval, cancel).await?;
        write_authenticated(
            reader,
            tool.retry,
            tool.key_type,
            &tool.key,
            &raw,
            request.trailer_block,
            &trailer,
        )
        .await?;
        Ok(CanonicalUid::from_bytes(&raw)?)
    })
    .await?;

    info!(uid = %uid, "Sector key provisioned on block {}", request.trailer_block);
    Ok(uid)
}

/// Wait for a tag and write `text` to a data block.
///
/// The text is left-justified and zero-padded (or truncated) to 16 bytes.
pub async fn write_text<R: CardReader>(
    reader: R,
    tool: &ToolConfig,
    block: u8,
    text: &str,
    cancel: &CancellationToken,
) -> Result<CanonicalUid> {
    if block == 0 || is_sector_trailer(block) {
        return Err(EngineError::config(format!("block {} is not a data block", block)));
    }

    let data = BlockData::from_text(text);
    let uid = with_reader(reader, async |reader| {
        let raw = wait_for_tag(reader, tool.poll_interval, cancel).await?;
        write_authenticated(reader, tool.retry, tool.key_type, &tool.key, &raw, block, &data)
            .await?;
        Ok(CanonicalUid::from_bytes(&raw)?)
    })
    .await?;

    info!(uid = %uid, "Wrote {:?} to block {}", data.text(), block);
    Ok(uid)
}

/// Initialize `reader`, run `work`, then release the reader once.
async fn with_reader<R, T, F>(mut reader: R, work: F) -> Result<T>
where
    R: CardReader,
    F: AsyncFnOnce(&mut R) -> Result<T>,
{
    let outcome = match reader.initialize().await {
        Ok(()) => work(&mut reader).await,
        Err(e) => Err(EngineError::ReaderInit(e)),
    };

    if let Err(e) = reader.cleanup().await {
        error!("Reader cleanup failed: {}", e);
    }

    outcome
}

/// Select the tag, authenticate `block`'s sector, write `data`, end the session.
///
/// Each primitive is retried under `retry`. A failed crypto stop after a
/// successful write is logged and ignored.
pub(crate) async fn write_authenticated<R: CardReader>(
    reader: &mut R,
    retry: RetryPolicy,
    key_type: KeyType,
    key: &MifareKey,
    raw: &[u8],
    block: u8,
    data: &BlockData,
) -> Result<()> {
    retry
        .run("select_tag", async || reader.select_tag(raw).await)
        .await?;
    retry
        .run("authenticate", async || {
            reader.authenticate(key_type, block, key, raw).await
        })
        .await?;
    retry
        .run("write_block", async || reader.write_block(block, data).await)
        .await?;

    if let Err(e) = reader.stop_crypto().await {
        warn!("Stop crypto failed after writing block {}: {}", block, e);
    }

    debug!("Wrote block {}", block);
    Ok(())
}
