use super::Registry;
use crate::error::{StorageError, StorageResult};
use crate::models::EnrolledTag;
use cardgate_core::CanonicalUid;
use chrono::Utc;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Default)]
struct Tags {
    by_uid: HashMap<String, EnrolledTag>,
    next_id: i64,
}

/// In-memory [`Registry`] keyed by canonical uid.
///
/// Contents live for the lifetime of the value. Inserts take the write lock
/// and check-and-insert under it, so a uid is enrolled at most once.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    tags: RwLock<Tags>,
    closed: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enrolled tags.
    pub async fn len(&self) -> usize {
        self.tags.read().await.by_uid.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Registry for MemoryRegistry {
    async fn init(&self) -> StorageResult<()> {
        self.ensure_open()
    }

    async fn lookup(&self, uid: &CanonicalUid) -> StorageResult<Option<EnrolledTag>> {
        self.ensure_open()?;
        Ok(self.tags.read().await.by_uid.get(uid.as_str()).cloned())
    }

    async fn insert(&self, uid: &CanonicalUid, label: &str) -> StorageResult<EnrolledTag> {
        self.ensure_open()?;

        let mut guard = self.tags.write().await;
        let tags = &mut *guard;

        match tags.by_uid.entry(uid.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists {
                uid: uid.to_string(),
            }),
            Entry::Vacant(slot) => {
                tags.next_id += 1;
                let tag = EnrolledTag {
                    id: tags.next_id,
                    uid: uid.to_string(),
                    label: label.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(tag.clone());
                info!(uid = %uid, label, "Stored new tag");
                Ok(tag)
            }
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_len_counts_only_successful_inserts() {
        let registry = MemoryRegistry::new();
        assert!(registry.is_empty().await);

        let a = CanonicalUid::from_bytes(&[1, 1]).unwrap();
        let b = CanonicalUid::from_bytes(&[2, 2]).unwrap();
        registry.insert(&a, "a").await.unwrap();
        registry.insert(&b, "b").await.unwrap();
        let _ = registry.insert(&a, "again").await;

        assert_eq!(registry.len().await, 2);
    }
}
