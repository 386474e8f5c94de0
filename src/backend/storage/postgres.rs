/**
 * PostgreSQL Document Store
 *
 * Persists document content and the operation log to PostgreSQL. Each
 * commit runs in one transaction: the document row is locked, its version
 * checked against the version the commit started from, the content
 * overwritten and the new log rows inserted.
 *
 * # Schema
 *
 * See `migrations/postgres`. Operations are stored as their JSON wire form.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{DocumentStore, PendingWrite, StoreError, StoredDocument};
use crate::backend::collab::document::LogEntry;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to `database_url` and run migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        tracing::info!("[Storage] Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations
    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        tracing::info!("[Storage] Running PostgreSQL migrations...");
        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        tracing::info!("[Storage] PostgreSQL migrations completed successfully");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn load_document(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT base_content, content
            FROM documents
            WHERE id = $1
            "#,
        )
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
            WHERE document_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;

        let operations = rows
            .into_iter()
            .map(|(version, operation, committed_at)| {
                Ok(LogEntry {
                    version: version as u64,
                    operation: serde_json::from_str(&operation)?,
                    committed_at,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Some(StoredDocument {
            base,
            content,
            operations,
        }))
    }

    async fn save_document(&self, doc_id: &str, write: PendingWrite<'_>) -> Result<(), StoreError> {
        let expected = write.expected_version();
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT version FROM documents WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(doc_id)
        .fetch_optional(&mut *tx)
        .await?;

        match current {
            None if expected == 0 => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (id, base_content, content, version, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, NOW(), NOW())
                    "#,
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
                    SET content = $2, version = $3, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(doc_id)
                .bind(write.content)
                .bind(write.version() as i64)
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
                r#"
                INSERT INTO document_operations (document_id, version, operation, committed_at)
                VALUES ($1, $2, $3, $4)
                "#,
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
        "postgres"
    }
}
