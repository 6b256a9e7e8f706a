//! Integration tests for registry uniqueness under concurrent access
//!
//! Run with: cargo test --package cardgate-storage --test integration_registry

use cardgate_core::CanonicalUid;
use cardgate_storage::{
    Database, DatabaseConfig, MemoryRegistry, Registry, SqliteRegistry, StorageError,
};
use std::sync::Arc;
use tokio::sync::Barrier;

const NUM_CONCURRENT_TASKS: usize = 10;

/// Fire `NUM_CONCURRENT_TASKS` inserts of the same uid, released together.
///
/// The futures are joined rather than spawned: `Registry` futures are not
/// known to be `Send` behind a generic bound.
async fn race_inserts<R: Registry>(registry: Arc<R>) -> Vec<Result<String, StorageError>> {
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));
    let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();

    let attempts = (0..NUM_CONCURRENT_TASKS).map(|i| {
        let registry = registry.clone();
        let barrier = barrier.clone();
        let uid = uid.clone();

        async move {
            barrier.wait().await;
            registry
                .insert(&uid, &format!("label-{i}"))
                .await
                .map(|tag| tag.label)
        }
    });

    futures::future::join_all(attempts).await
}

fn assert_single_winner(results: &[Result<String, StorageError>]) -> String {
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one insert must succeed");

    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(StorageError::AlreadyExists { .. })))
        .count();
    assert_eq!(losers, NUM_CONCURRENT_TASKS - 1);

    winners[0].clone()
}

#[tokio::test]
async fn test_concurrent_inserts_sqlite_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rfid_tags.db").to_string_lossy().to_string();
    let db = Database::new(DatabaseConfig::new(path).max_connections(NUM_CONCURRENT_TASKS as u32))
        .await
        .unwrap();
    let registry = Arc::new(SqliteRegistry::new(db));
    registry.init().await.unwrap();

    let results = race_inserts(registry.clone()).await;
    let winner = assert_single_winner(&results);

    let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();
    let stored = registry.lookup(&uid).await.unwrap().unwrap();
    assert_eq!(stored.label, winner);

    registry.close().await;
}

#[tokio::test]
async fn test_concurrent_inserts_memory_single_winner() {
    let registry = Arc::new(MemoryRegistry::new());

    let results = race_inserts(registry.clone()).await;
    let winner = assert_single_winner(&results);

    let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239]).unwrap();
    assert_eq!(registry.lookup(&uid).await.unwrap().unwrap().label, winner);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn test_different_uids_enroll_independently() {
    let registry = SqliteRegistry::new(Database::in_memory().await.unwrap());
    registry.init().await.unwrap();

    for i in 0..5u8 {
        let uid = CanonicalUid::from_bytes(&[i, i, i, i]).unwrap();
        registry.insert(&uid, &format!("tag {i}")).await.unwrap();
    }

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rfid_tags")
        .fetch_one(registry.database().pool())
        .await
        .unwrap();
    assert_eq!(count.0, 5);

    registry.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='rfid_tags'")
            .fetch_one(db.pool())
            .await
            .unwrap();

    assert_eq!(result.0, 1);

    db.close().await;
}
