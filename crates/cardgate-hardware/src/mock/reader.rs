//! Mock card reader implementation for testing and development.
//!
//! This module provides a simulated MIFARE Classic reader that can be
//! controlled programmatically. Tags are placed in and removed from the
//! field through a [`MockReaderHandle`], faults can be injected per
//! operation, and every primitive call is counted so tests can assert on
//! hardware side effects.

use crate::{
    HardwareError, Result,
    error::{STATUS_ERROR, STATUS_NO_TAG},
    traits::CardReader,
    types::{BlockData, KeyType, MifareKey, SectorTrailer, TagType, is_sector_trailer, sector_of},
};
use cardgate_core::constants::BLOCKS_PER_SECTOR;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Reader primitive, used to inject faults and read call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Initialize,
    Request,
    AntiCollision,
    Select,
    Authenticate,
    Write,
    StopCrypto,
    Cleanup,
}

/// Memory of one simulated tag.
#[derive(Debug, Clone)]
struct TagMemory {
    tag_type: TagType,
    blocks: HashMap<u8, BlockData>,
}

impl TagMemory {
    fn new(tag_type: TagType) -> Self {
        Self {
            tag_type,
            blocks: HashMap::new(),
        }
    }

    /// Trailer of `sector`, factory default when never written.
    fn trailer(&self, sector: u8) -> SectorTrailer {
        let trailer_block = sector * BLOCKS_PER_SECTOR + BLOCKS_PER_SECTOR - 1;
        self.blocks
            .get(&trailer_block)
            .map(SectorTrailer::from_block)
            .unwrap_or_else(|| SectorTrailer::with_key(MifareKey::DEFAULT))
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Known tags by raw UID.
    tags: HashMap<Vec<u8>, TagMemory>,

    /// UID of the tag currently in the field.
    present: Option<Vec<u8>>,

    /// Selected tag.
    selected: Option<Vec<u8>>,

    /// Sector authenticated in the current session.
    authenticated: Option<u8>,

    /// Remaining injected failures per operation.
    fail_next: HashMap<MockOperation, u32>,

    /// Operations that always fail.
    fail_always: Vec<MockOperation>,

    /// Number of calls per operation.
    calls: HashMap<MockOperation, u32>,
}

impl MockState {
    /// Count the call and report whether an injected fault fires.
    fn enter(&mut self, op: MockOperation) -> bool {
        *self.calls.entry(op).or_insert(0) += 1;

        if self.fail_always.contains(&op) {
            return true;
        }

        match self.fail_next.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Mock card reader for testing and development.
///
/// # Examples
///
/// ```
/// use cardgate_hardware::mock::MockReader;
/// use cardgate_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> cardgate_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///
///     // No tag in the field: the request phase fails
///     assert!(reader.poll_for_tag().await.is_err());
///
///     handle.present_tag(vec![0x04, 0xAB, 0xCD, 0xEF]);
///     let uid = reader.poll_for_tag().await?;
///     assert_eq!(uid, vec![0x04, 0xAB, 0xCD, 0xEF]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    /// Shared simulated state
    state: Arc<Mutex<MockState>>,

    /// Device name
    name: String,
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// controls the tags in the field and injected faults.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock MFRC522".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));

        let reader = Self {
            state: Arc::clone(&state),
            name,
        };

        (reader, MockReaderHandle { state })
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new().0
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    // A panic while holding the lock leaves the state usable for the mock.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CardReader for MockReader {
    async fn initialize(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.enter(MockOperation::Initialize) {
            return Err(HardwareError::initialization_failed(format!(
                "{}: SPI device unavailable",
                self.name
            )));
        }
        Ok(())
    }

    async fn request(&mut self) -> Result<TagType> {
        let mut state = self.state();
        if state.enter(MockOperation::Request) {
            return Err(HardwareError::request(STATUS_ERROR));
        }

        let present = state.present.clone();
        match present.and_then(|uid| state.tags.get(&uid).map(|tag| tag.tag_type)) {
            Some(tag_type) => Ok(tag_type),
            None => Err(HardwareError::request(STATUS_NO_TAG)),
        }
    }

    async fn anticoll(&mut self) -> Result<Vec<u8>> {
        let mut state = self.state();
        if state.enter(MockOperation::AntiCollision) {
            return Err(HardwareError::anticoll(STATUS_ERROR));
        }

        state
            .present
            .clone()
            .ok_or_else(|| HardwareError::anticoll(STATUS_NO_TAG))
    }

    async fn select_tag(&mut self, uid: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.enter(MockOperation::Select) {
            return Err(HardwareError::select("no answer to SELECT"));
        }

        if state.present.as_deref() != Some(uid) {
            return Err(HardwareError::select(format!("tag {:02X?} not in field", uid)));
        }

        state.selected = Some(uid.to_vec());
        Ok(())
    }

    async fn authenticate(
        &mut self,
        key_type: KeyType,
        block: u8,
        key: &MifareKey,
        uid: &[u8],
    ) -> Result<()> {
        let mut state = self.state();
        if state.enter(MockOperation::Authenticate) {
            return Err(HardwareError::authentication(block));
        }

        if state.present.as_deref() != Some(uid) {
            return Err(HardwareError::authentication(block));
        }

        let sector = sector_of(block);
        let trailer = state
            .tags
            .get(uid)
            .map(|tag| tag.trailer(sector))
            .ok_or_else(|| HardwareError::authentication(block))?;

        let expected = match key_type {
            KeyType::KeyA => trailer.key_a,
            KeyType::KeyB => trailer.key_b,
        };

        if expected != *key {
            state.authenticated = None;
            return Err(HardwareError::authentication(block));
        }

        state.authenticated = Some(sector);
        Ok(())
    }

    async fn write_block(&mut self, block: u8, data: &BlockData) -> Result<()> {
        let mut state = self.state();
        if state.enter(MockOperation::Write) {
            return Err(HardwareError::write(block, "no ACK from tag"));
        }

        if state.authenticated != Some(sector_of(block)) {
            return Err(HardwareError::NotAuthenticated { block });
        }

        let uid = state
            .present
            .clone()
            .ok_or_else(|| HardwareError::write(block, "tag left the field"))?;

        if let Some(tag) = state.tags.get_mut(&uid) {
            tag.blocks.insert(block, *data);
        }

        if is_sector_trailer(block) {
            debug!("Sector {} trailer rewritten", sector_of(block));
        }

        Ok(())
    }

    async fn stop_crypto(&mut self) -> Result<()> {
        let mut state = self.state();
        let fault = state.enter(MockOperation::StopCrypto);
        state.authenticated = None;
        if fault {
            return Err(HardwareError::crypto_stop("reader did not acknowledge"));
        }
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.enter(MockOperation::Cleanup) {
            return Err(HardwareError::cleanup("GPIO release failed"));
        }
        state.selected = None;
        state.authenticated = None;
        Ok(())
    }
}

/// Handle for controlling a mock card reader.
///
/// Cloned handles share the same simulated field and tag memory.
///
/// # Examples
///
/// ```
/// use cardgate_hardware::mock::{MockOperation, MockReader};
///
/// let (_reader, handle) = MockReader::new();
///
/// handle.present_tag(vec![1, 2, 3, 4]);
/// assert_eq!(handle.present_uid(), Some(vec![1, 2, 3, 4]));
///
/// handle.fail_next(MockOperation::Request, 2);
/// handle.remove_tag();
/// assert_eq!(handle.present_uid(), None);
/// ```
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Another reader over the same simulated field.
    pub fn reader(&self) -> MockReader {
        MockReader {
            state: Arc::clone(&self.state),
            name: "Mock MFRC522".to_string(),
        }
    }

    /// Place a MIFARE Classic 1K tag in the field.
    pub fn present_tag(&self, uid: Vec<u8>) {
        self.present_tag_with_type(uid, TagType::MifareClassic1K);
    }

    /// Place a tag of the given type in the field.
    ///
    /// A tag seen before keeps its memory (written blocks and keys).
    pub fn present_tag_with_type(&self, uid: Vec<u8>, tag_type: TagType) {
        let mut state = self.state();
        state
            .tags
            .entry(uid.clone())
            .or_insert_with(|| TagMemory::new(tag_type));
        debug!("Mock tag {:02X?} presented", uid);
        state.present = Some(uid);
    }

    /// Remove the tag from the field.
    pub fn remove_tag(&self) {
        let mut state = self.state();
        state.present = None;
        state.selected = None;
        state.authenticated = None;
    }

    /// UID of the tag currently in the field.
    pub fn present_uid(&self) -> Option<Vec<u8>> {
        self.state().present.clone()
    }

    /// UID of the tag selected by the last successful `select_tag`.
    pub fn selected_uid(&self) -> Option<Vec<u8>> {
        self.state().selected.clone()
    }

    /// Make the next `count` calls of `op` fail.
    pub fn fail_next(&self, op: MockOperation, count: u32) {
        *self.state().fail_next.entry(op).or_insert(0) += count;
    }

    /// Make every call of `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn fail_always(&self, op: MockOperation) {
        let mut state = self.state();
        if !state.fail_always.contains(&op) {
            state.fail_always.push(op);
        }
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.fail_next.clear();
        state.fail_always.clear();
    }

    /// Number of calls made to `op`.
    pub fn call_count(&self, op: MockOperation) -> u32 {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Contents of `block` on the tag with `uid`, if it was ever written.
    pub fn block(&self, uid: &[u8], block: u8) -> Option<BlockData> {
        self.state()
            .tags
            .get(uid)
            .and_then(|tag| tag.blocks.get(&block).copied())
    }

    /// Current trailer of `sector` on the tag with `uid`.
    pub fn sector_trailer(&self, uid: &[u8], sector: u8) -> Option<SectorTrailer> {
        self.state().tags.get(uid).map(|tag| tag.trailer(sector))
    }
}
