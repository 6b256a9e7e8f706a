//! Value types shared by card reader implementations.
//!
//! This module defines the tag type reported by the request phase, key
//! material, 16-byte block payloads and the sector trailer layout used when
//! provisioning a custom key.

use crate::error::{HardwareError, Result};
use cardgate_core::constants::{
    ACCESS_BITS_SIZE, BLOCK_SIZE, BLOCKS_PER_SECTOR, DEFAULT_ACCESS_BITS, DEFAULT_KEY, KEY_SIZE,
    MARKER_TEXT,
};
use std::fmt;

/// Tag type identified from the ATQA answer to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagType {
    /// Mifare Classic 1K (1024 bytes).
    MifareClassic1K,

    /// Mifare Classic 4K (4096 bytes).
    MifareClassic4K,

    /// Mifare Ultralight (64 bytes).
    MifareUltralight,

    /// Unknown tag with its raw ATQA.
    Unknown(u16),
}

impl TagType {
    /// Identify a tag from its two-byte ATQA.
    pub fn from_atqa(atqa: u16) -> Self {
        match atqa {
            0x0004 => Self::MifareClassic1K,
            0x0002 => Self::MifareClassic4K,
            0x0044 => Self::MifareUltralight,
            other => Self::Unknown(other),
        }
    }

    /// Get a human-readable name for the tag type.
    pub fn name(&self) -> &str {
        match self {
            Self::MifareClassic1K => "Mifare Classic 1K",
            Self::MifareClassic4K => "Mifare Classic 4K",
            Self::MifareUltralight => "Mifare Ultralight",
            Self::Unknown(_) => "Unknown",
        }
    }
}

/// Which sector key an authentication uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyType {
    /// Key A (`AUTHENT1A`, command 0x60).
    #[default]
    KeyA,

    /// Key B (`AUTHENT1B`, command 0x61).
    KeyB,
}

impl KeyType {
    /// PICC authentication command byte for this key.
    pub fn command(&self) -> u8 {
        match self {
            Self::KeyA => 0x60,
            Self::KeyB => 0x61,
        }
    }
}

/// Six-byte MIFARE Classic sector key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MifareKey([u8; KEY_SIZE]);

impl MifareKey {
    /// Factory default key `FF FF FF FF FF FF`.
    pub const DEFAULT: MifareKey = MifareKey(DEFAULT_KEY);

    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl Default for MifareKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for MifareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MifareKey({})", self)
    }
}

impl fmt::Display for MifareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MifareKey {
    type Err = HardwareError;

    /// Parse twelve hex digits, optionally separated by `:`, `-` or spaces.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_hardware::types::MifareKey;
    ///
    /// let key: MifareKey = "A1:B2:C3:D4:E5:F6".parse().unwrap();
    /// assert_eq!(key.as_bytes(), &[0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]);
    /// assert!("A1B2".parse::<MifareKey>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let bytes = parse_hex(s)?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            HardwareError::invalid_data(format!(
                "Key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }
}

/// Four access-condition bytes of a sector trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessBits([u8; ACCESS_BITS_SIZE]);

impl AccessBits {
    /// Wrap raw access bytes.
    pub fn new(bytes: [u8; ACCESS_BITS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw access bytes.
    pub fn as_bytes(&self) -> &[u8; ACCESS_BITS_SIZE] {
        &self.0
    }
}

impl Default for AccessBits {
    fn default() -> Self {
        Self(DEFAULT_ACCESS_BITS)
    }
}

impl std::str::FromStr for AccessBits {
    type Err = HardwareError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = parse_hex(s)?;
        let bits: [u8; ACCESS_BITS_SIZE] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            HardwareError::invalid_data(format!(
                "Access bits must be {} bytes, got {}",
                ACCESS_BITS_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bits))
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();

    if !digits.is_ascii() {
        return Err(HardwareError::invalid_data(format!("Invalid hex in {s:?}")));
    }

    if digits.len() % 2 != 0 {
        return Err(HardwareError::invalid_data(format!(
            "Odd number of hex digits in {s:?}"
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| HardwareError::invalid_data(format!("Invalid hex in {s:?}")))
        })
        .collect()
}

/// Sixteen-byte block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockData([u8; BLOCK_SIZE]);

impl BlockData {
    /// Wrap raw block bytes.
    pub fn new(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Encode text left-justified and zero-padded, truncating past 16 bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_hardware::types::BlockData;
    ///
    /// let block = BlockData::from_text("HelloWorld!");
    /// assert_eq!(&block.as_bytes()[..11], b"HelloWorld!");
    /// assert_eq!(&block.as_bytes()[11..], &[0u8; 5]);
    /// ```
    pub fn from_text(text: &str) -> Self {
        let mut bytes = [0u8; BLOCK_SIZE];
        let source = text.as_bytes();
        let len = source.len().min(BLOCK_SIZE);
        bytes[..len].copy_from_slice(&source[..len]);
        Self(bytes)
    }

    /// The enrollment marker: `"Registered"` zero-padded to 16 bytes.
    pub fn marker() -> Self {
        Self::from_text(MARKER_TEXT)
    }

    /// Get the raw block bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Text content up to the first zero byte, lossily decoded.
    pub fn text(&self) -> String {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(BLOCK_SIZE);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

/// Sector trailer layout: `key A (6) ++ access bits (4) ++ key B (6)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorTrailer {
    /// Key A written to the trailer.
    pub key_a: MifareKey,

    /// Access conditions.
    pub access_bits: AccessBits,

    /// Key B written to the trailer.
    pub key_b: MifareKey,
}

impl SectorTrailer {
    /// Trailer using `key` for both key A and key B with the default access bits.
    pub fn with_key(key: MifareKey) -> Self {
        Self {
            key_a: key,
            access_bits: AccessBits::default(),
            key_b: key,
        }
    }

    /// Set the access conditions.
    pub fn access_bits(mut self, access_bits: AccessBits) -> Self {
        self.access_bits = access_bits;
        self
    }

    /// Set key B.
    pub fn key_b(mut self, key_b: MifareKey) -> Self {
        self.key_b = key_b;
        self
    }

    /// Encode the trailer as a block payload.
    pub fn to_block(&self) -> BlockData {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[..KEY_SIZE].copy_from_slice(self.key_a.as_bytes());
        bytes[KEY_SIZE..KEY_SIZE + ACCESS_BITS_SIZE].copy_from_slice(self.access_bits.as_bytes());
        bytes[KEY_SIZE + ACCESS_BITS_SIZE..].copy_from_slice(self.key_b.as_bytes());
        BlockData(bytes)
    }

    /// Decode a trailer from a block payload.
    pub fn from_block(block: &BlockData) -> Self {
        let bytes = block.as_bytes();
        let mut key_a = [0u8; KEY_SIZE];
        let mut access = [0u8; ACCESS_BITS_SIZE];
        let mut key_b = [0u8; KEY_SIZE];
        key_a.copy_from_slice(&bytes[..KEY_SIZE]);
        access.copy_from_slice(&bytes[KEY_SIZE..KEY_SIZE + ACCESS_BITS_SIZE]);
        key_b.copy_from_slice(&bytes[KEY_SIZE + ACCESS_BITS_SIZE..]);
        Self {
            key_a: MifareKey(key_a),
            access_bits: AccessBits(access),
            key_b: MifareKey(key_b),
        }
    }
}

/// Sector that contains `block`.
pub fn sector_of(block: u8) -> u8 {
    block / BLOCKS_PER_SECTOR
}

/// Whether `block` is the trailer of its sector.
pub fn is_sector_trailer(block: u8) -> bool {
    block % BLOCKS_PER_SECTOR == BLOCKS_PER_SECTOR - 1
}
