//! Enum wrapper for card reader dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) are not
//! object-safe, so we cannot use `Box<dyn CardReader>`. The binary picks its
//! reader at runtime through [`AnyCardReader`] instead, which keeps concrete
//! type dispatch at compile time.
//!
//! # Examples
//!
//! ```
//! use cardgate_hardware::devices::AnyCardReader;
//! use cardgate_hardware::mock::MockReader;
//!
//! let (reader, _handle) = MockReader::new();
//! let any_reader = AnyCardReader::Mock(reader);
//! assert_eq!(any_reader.name(), "Mock MFRC522");
//! ```

use crate::Result;
use crate::mock::MockReader;
use crate::traits::CardReader;
use crate::types::{BlockData, KeyType, MifareKey, TagType};

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Simulated reader for development and testing.
    Mock(MockReader),
}

impl AnyCardReader {
    /// Name of the wrapped reader.
    pub fn name(&self) -> &str {
        match self {
            Self::Mock(device) => device.name(),
        }
    }
}

impl CardReader for AnyCardReader {
    async fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.initialize().await,
        }
    }

    async fn request(&mut self) -> Result<TagType> {
        match self {
            Self::Mock(device) => device.request().await,
        }
    }

    async fn anticoll(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Mock(device) => device.anticoll().await,
        }
    }

    async fn select_tag(&mut self, uid: &[u8]) -> Result<()> {
        match self {
            Self::Mock(device) => device.select_tag(uid).await,
        }
    }

    async fn authenticate(
        &mut self,
        key_type: KeyType,
        block: u8,
        key: &MifareKey,
        uid: &[u8],
    ) -> Result<()> {
        match self {
            Self::Mock(device) => device.authenticate(key_type, block, key, uid).await,
        }
    }

    async fn write_block(&mut self, block: u8, data: &BlockData) -> Result<()> {
        match self {
            Self::Mock(device) => device.write_block(block, data).await,
        }
    }

    async fn stop_crypto(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_crypto().await,
        }
    }

    async fn cleanup(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.cleanup().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOperation;

    #[tokio::test]
    async fn test_any_reader_dispatches_to_mock() {
        let (reader, handle) = MockReader::with_name("Bench Reader".to_string());
        let mut any_reader = AnyCardReader::Mock(reader);

        assert_eq!(any_reader.name(), "Bench Reader");

        handle.present_tag(vec![1, 2, 3, 4]);
        assert_eq!(any_reader.poll_for_tag().await.unwrap(), vec![1, 2, 3, 4]);

        any_reader.cleanup().await.unwrap();
        assert_eq!(handle.call_count(MockOperation::Cleanup), 1);
    }
}
