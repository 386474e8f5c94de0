/**
 * SQLite Document Store
 *
 * Same layout as the PostgreSQL store, for single-node deployments and
 * tests. `sqlite::memory:` URLs get a single pinned connection, since every
 * SQLite in-memory connection is its own database.
 */

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::{DocumentStore, PendingWrite, StoreError, StoredDocument};
use crate::backend::collab::document::LogEntry;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `database_url` and run migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        tracing::debug!("[Storage] SQLite schema ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn load_document(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT base_content, content FROM documents WHERE id = ?")
                .bind(doc_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((base, content)) = row else {
            return Ok(None);
        };

        let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT version, operation, committed_at
            FROM document_operations
            WHERE document_id = ?
            ORDER BY version ASC
            "#,
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        let mut operations = Vec::with_capacity(rows.len());
        for (version, operation, committed_at) in rows {
            operations.push(LogEntry {
                version: version as u64,
                operation: serde_json::from_str(&operation)?,
                committed_at,
            });
        }

        Ok(Some(StoredDocument {
            base,
            content,
            operations,
        }))
    }

    async fn save_document(&self, doc_id: &str, write: PendingWrite<'_>) -> Result<(), StoreError> {
        let expected = write.expected_version();
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM documents WHERE id = ?")
            .bind(doc_id)
            .fetch_optional(&mut *tx)
            .await?;

        match current {
            None if expected == 0 => {
                sqlx::query(
                    "INSERT INTO documents (id, base_content, content, version) VALUES (?, ?, ?, ?)",
                )
                .bind(doc_id)
                .bind(write.base)
                .bind(write.content)
                .bind(write.version() as i64)
                .execute(&mut *tx)
                .await?;
            }
            Some((found,)) if found as u64 == expected => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET content = ?, version = ?, updated_at = CURRENT_TIMESTAMP
                    WHERE id = ?
                    "#,
                )
                .bind(write.content)
                .bind(write.version() as i64)
                .bind(doc_id)
                .execute(&mut *tx)
                .await?;
            }
            other => {
                return Err(StoreError::Conflict {
                    doc_id: doc_id.to_string(),
                    expected,
                    found: other.map(|(found,)| found as u64).unwrap_or_default(),
                });
            }
        }

        for entry in write.operations {
            sqlx::query(
                "INSERT INTO document_operations (document_id, version, operation, committed_at) VALUES (?, ?, ?, ?)",
            )
            .bind(doc_id)
            .bind(entry.version as i64)
            .bind(serde_json::to_string(&entry.operation)?)
            .bind(entry.committed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
