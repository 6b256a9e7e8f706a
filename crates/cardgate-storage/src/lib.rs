//! Storage layer for the card gate.
//!
//! This crate provides the registry of enrolled credentials: a mapping from
//! canonical uid to the operator-supplied label and enrollment time.
//!
//! # Architecture
//!
//! - [`Registry`] - Backend-agnostic contract (`init`, `lookup`, `insert`, `close`)
//! - [`SqliteRegistry`] - SQLite table `rfid_tags (id, uid UNIQUE, label, created_at)`
//! - [`MemoryRegistry`] - Map held for the lifetime of the process
//! - [`AnyRegistry`] - Enum dispatch for runtime backend selection
//! - [`Database`] - Connection pool manager with embedded migrations
//!
//! # Uniqueness
//!
//! Both backends guarantee that at most one insert per uid succeeds. The
//! loser receives [`StorageError::AlreadyExists`] and the stored label is
//! left unchanged.
//!
//! # Examples
//!
//! ```no_run
//! use cardgate_core::CanonicalUid;
//! use cardgate_storage::{Database, DatabaseConfig, Registry, SqliteRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("rfid_tags.db")).await?;
//! let registry = SqliteRegistry::new(db);
//! registry.init().await?;
//!
//! let uid = CanonicalUid::from_bytes(&[4, 171, 205, 239])?;
//! if registry.lookup(&uid).await?.is_none() {
//!     registry.insert(&uid, "Alice").await?;
//! }
//!
//! registry.close().await;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod registry;

pub use connection::{DEFAULT_DATABASE_PATH, Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::EnrolledTag;
pub use registry::{AnyRegistry, MemoryRegistry, Registry, SqliteRegistry};
