use super::Registry;
use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use crate::models::EnrolledTag;
use cardgate_core::CanonicalUid;
use chrono::{SubsecRound, Utc};
use tracing::{debug, info};

/// SQLite implementation of [`Registry`] over the `rfid_tags` table.
///
/// Uniqueness is enforced by the `UNIQUE` constraint on `uid`, so two
/// concurrent inserts of the same uid race inside SQLite and exactly one
/// wins.
#[derive(Debug, Clone)]
pub struct SqliteRegistry {
    db: Database,
}

impl SqliteRegistry {
    /// Wrap an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.db.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

/// Map sqlx failures onto registry outcomes.
fn map_insert_error(err: sqlx::Error, uid: &CanonicalUid) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StorageError::AlreadyExists {
                uid: uid.to_string(),
            }
        }
        sqlx::Error::PoolClosed => StorageError::Closed,
        other => StorageError::Database(other),
    }
}

impl Registry for SqliteRegistry {
    async fn init(&self) -> StorageResult<()> {
        self.ensure_open()?;
        self.db.migrate().await?;
        debug!("SQLite registry schema ready");
        Ok(())
    }

    async fn lookup(&self, uid: &CanonicalUid) -> StorageResult<Option<EnrolledTag>> {
        self.ensure_open()?;

        let tag = sqlx::query_as::<_, EnrolledTag>(
            r#"
            SELECT id, uid, label, created_at
            FROM rfid_tags
            WHERE uid = ?
            "#,
        )
        .bind(uid.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::PoolClosed => StorageError::Closed,
            other => StorageError::Database(other),
        })?;

        Ok(tag)
    }

    async fn insert(&self, uid: &CanonicalUid, label: &str) -> StorageResult<EnrolledTag> {
        self.ensure_open()?;

        let created_at = Utc::now().trunc_subsecs(6);

        let result = sqlx::query(
            r#"
            INSERT INTO rfid_tags (uid, label, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(uid.as_str())
        .bind(label)
        .bind(created_at)
        .execute(self.db.pool())
        .await
        .map_err(|e| map_insert_error(e, uid))?;

        info!(uid = %uid, label, "Stored new tag");

        Ok(EnrolledTag {
            id: result.last_insert_rowid(),
            uid: uid.to_string(),
            label: label.to_string(),
            created_at,
        })
    }

    async fn close(&self) {
        self.db.close().await;
        debug!("SQLite registry closed");
    }

    fn is_closed(&self) -> bool {
        self.db.is_closed()
    }
}
