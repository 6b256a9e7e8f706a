use thiserror::Error;

/// Storage-specific error types for the card gate registry.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A tag with this uid is already enrolled.
    ///
    /// Returned by `Registry::insert` when it loses to an earlier (or
    /// concurrent) insert of the same uid. The stored row is left untouched.
    #[error("Tag already enrolled: {uid}")]
    AlreadyExists { uid: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The registry was closed
    #[error("Registry is closed")]
    Closed,
}

impl StorageError {
    /// Whether this is the uniqueness-violation outcome of an insert.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists { .. })
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
