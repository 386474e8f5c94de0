//! Document Storage Module
//!
//! This module defines the storage collaborator the collaborative editing
//! core persists through, and its implementations.
//!
//! # Architecture
//!
//! - **`memory`** - In-process store, used when no database is configured
//! - **`postgres`** - PostgreSQL store (sqlx)
//! - **`sqlite`** - SQLite store (sqlx), handy for single-node deployments
//!
//! # Contract
//!
//! A store keeps, per document id, the base content (content at version 0),
//! the current content, and the ordered operation log. `save_document` is
//! called from inside a document's commit critical section with the new
//! content and the log entries the commit appended; it must be atomic, and it
//! must refuse the write when the stored version is not the one the commit
//! started from.
//!
//! # Module Structure
//!
//! ```text
//! storage/
//! ├── mod.rs       - DocumentStore trait and shared types
//! ├── memory.rs    - In-memory store
//! ├── postgres.rs  - PostgreSQL store
//! └── sqlite.rs    - SQLite store
//! ```

/// In-memory store
pub mod memory;

/// PostgreSQL store
pub mod postgres;

/// SQLite store
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::collab::document::LogEntry;
use crate::shared::EditError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// A document as persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredDocument {
    /// Content at version 0
    pub base: String,
    /// Content after every logged operation
    pub content: String,
    /// Operation log, in version order
    pub operations: Vec<LogEntry>,
}

/// One commit's worth of changes handed to the store
#[derive(Debug, Clone, Copy)]
pub struct PendingWrite<'a> {
    /// Content at version 0, written when the document is first created
    pub base: &'a str,
    /// Content after the commit
    pub content: &'a str,
    /// Entries appended by the commit
    pub operations: &'a [LogEntry],
}

impl PendingWrite<'_> {
    /// Version the document is at after this write
    pub fn version(&self) -> u64 {
        self.operations
            .last()
            .map(|entry| entry.version)
            .unwrap_or_else(|| self.expected_version())
    }

    /// Version the stored document must be at before this write
    pub fn expected_version(&self) -> u64 {
        self.operations
            .first()
            .map(|entry| entry.version - 1)
            .unwrap_or_default()
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored operation could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored version does not match the version the write was based on
    #[error("Version conflict on document '{doc_id}': expected {expected}, found {found}")]
    Conflict {
        doc_id: String,
        expected: u64,
        found: u64,
    },

    /// Store refused the operation for another reason
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for EditError {
    fn from(err: StoreError) -> Self {
        EditError::storage(err.to_string())
    }
}

/// Storage collaborator consumed by the collaborative editing core
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document, `None` if it was never saved
    async fn load_document(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Persist a commit: overwrite the content and append the new log entries
    async fn save_document(&self, doc_id: &str, write: PendingWrite<'_>) -> Result<(), StoreError>;

    /// Ids of every stored document
    async fn list_documents(&self) -> Result<Vec<String>, StoreError>;

    /// Short name for logging
    fn backend_name(&self) -> &'static str;
}

/// Which store a database URL selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
    Sqlite,
}

impl StoreKind {
    /// Classify an optional `DATABASE_URL`
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            None => Self::Memory,
            Some(url) if url.starts_with("sqlite:") => Self::Sqlite,
            Some(_) => Self::Postgres,
        }
    }
}
