//! Registry of enrolled credentials.
//!
//! The [`Registry`] trait is the contract the engine consumes; it is
//! implemented by [`SqliteRegistry`] (relational table `rfid_tags`) and by
//! [`MemoryRegistry`] (a map held for the lifetime of the process). Both
//! enforce uid uniqueness: at most one `insert` per uid ever succeeds, and a
//! losing insert reports [`StorageError::AlreadyExists`] without touching the
//! stored row.
//!
//! [`StorageError::AlreadyExists`]: crate::StorageError::AlreadyExists

#![allow(async_fn_in_trait)]

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;

use crate::error::StorageResult;
use crate::models::EnrolledTag;
use cardgate_core::CanonicalUid;

/// Lookup/insert abstraction over enrolled credentials.
///
/// This trait uses native async trait methods (Edition 2024 feature), so it
/// is not object-safe; runtime backend selection goes through
/// [`AnyRegistry`].
pub trait Registry: Send + Sync {
    /// Create the underlying storage if absent. Idempotent.
    async fn init(&self) -> StorageResult<()>;

    /// Find the enrolled tag for `uid`. Never mutates.
    async fn lookup(&self, uid: &CanonicalUid) -> StorageResult<Option<EnrolledTag>>;

    /// Enroll `uid` under `label`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if `uid` is already enrolled.
    async fn insert(&self, uid: &CanonicalUid, label: &str) -> StorageResult<EnrolledTag>;

    /// Release underlying resources. Further calls fail with `Closed`.
    async fn close(&self);

    /// Whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Enum wrapper for registry backend dispatch.
#[derive(Debug)]
pub enum AnyRegistry {
    Sqlite(SqliteRegistry),
    Memory(MemoryRegistry),
}

impl AnyRegistry {
    /// Short backend name for logging.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }
}

impl Registry for AnyRegistry {
    async fn init(&self) -> StorageResult<()> {
        match self {
            Self::Sqlite(registry) => registry.init().await,
            Self::Memory(registry) => registry.init().await,
        }
    }

    async fn lookup(&self, uid: &CanonicalUid) -> StorageResult<Option<EnrolledTag>> {
        match self {
            Self::Sqlite(registry) => registry.lookup(uid).await,
            Self::Memory(registry) => registry.lookup(uid).await,
        }
    }

    async fn insert(&self, uid: &CanonicalUid, label: &str) -> StorageResult<EnrolledTag> {
        match self {
            Self::Sqlite(registry) => registry.insert(uid, label).await,
            Self::Memory(registry) => registry.insert(uid, label).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Sqlite(registry) => registry.close().await,
            Self::Memory(registry) => registry.close().await,
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Sqlite(registry) => registry.is_closed(),
            Self::Memory(registry) => registry.is_closed(),
        }
    }
}

impl From<SqliteRegistry> for AnyRegistry {
    fn from(registry: SqliteRegistry) -> Self {
        Self::Sqlite(registry)
    }
}

impl From<MemoryRegistry> for AnyRegistry {
    fn from(registry: MemoryRegistry) -> Self {
        Self::Memory(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use rstest::rstest;

    async fn backend(name: &str) -> AnyRegistry {
        match name {
            "sqlite" => SqliteRegistry::new(Database::in_memory().await.unwrap()).into(),
            _ => MemoryRegistry::new().into(),
        }
    }

    #[rstest]
    #[case("sqlite")]
    #[case("memory")]
    #[tokio::test]
    async fn test_contract_insert_then_lookup(#[case] name: &str) {
        let registry = backend(name).await;
        assert_eq!(registry.backend(), name);
        registry.init().await.unwrap();
        // init is idempotent
        registry.init().await.unwrap();

        let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();
        assert!(registry.lookup(&uid).await.unwrap().is_none());

        let created = registry.insert(&uid, "Bob").await.unwrap();
        assert_eq!(created.uid, "4-171-205-239");
        assert_eq!(created.label, "Bob");

        let found = registry.lookup(&uid).await.unwrap().unwrap();
        assert_eq!(found.label, "Bob");
        assert_eq!(found.created_at, created.created_at);
    }

    #[rstest]
    #[case("sqlite")]
    #[case("memory")]
    #[tokio::test]
    async fn test_contract_duplicate_insert_keeps_original(#[case] name: &str) {
        let registry = backend(name).await;
        registry.init().await.unwrap();
        let uid = CanonicalUid::from_bytes(&[1, 2, 3, 4]).unwrap();

        registry.insert(&uid, "Alice").await.unwrap();
        let err = registry.insert(&uid, "Mallory").await.unwrap_err();

        assert!(err.is_already_exists());
        let found = registry.lookup(&uid).await.unwrap().unwrap();
        assert_eq!(found.label, "Alice");
    }

    #[rstest]
    #[case("sqlite")]
    #[case("memory")]
    #[tokio::test]
    async fn test_contract_close(#[case] name: &str) {
        let registry = backend(name).await;
        registry.init().await.unwrap();
        assert!(!registry.is_closed());

        registry.close().await;

        assert!(registry.is_closed());
        let uid = CanonicalUid::from_bytes(&[9]).unwrap();
        assert!(matches!(
            registry.lookup(&uid).await,
            Err(crate::StorageError::Closed)
        ));
    }
}
