/**
 * In-Memory Document Store
 *
 * Keeps documents in a process-local map. Used when `DATABASE_URL` is not
 * set, and by tests. Nothing survives a restart.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentStore, PendingWrite, StoreError, StoredDocument};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one document seeded with `base` at version 0
    pub fn with_document(doc_id: impl Into<String>, base: impl Into<String>) -> Self {
        let base = base.into();
        let mut documents = HashMap::new();
        documents.insert(
            doc_id.into(),
            StoredDocument {
                content: base.clone(),
                base,
                operations: Vec::new(),
            },
        );
        Self {
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load_document(&self, doc_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.documents.read().get(doc_id).cloned())
    }

    async fn save_document(&self, doc_id: &str, write: PendingWrite<'_>) -> Result<(), StoreError> {
        let mut documents = self.documents.write();
        let found = documents
            .get(doc_id)
            .map(|stored| stored.operations.len() as u64)
            .unwrap_or_default();
        if found != write.expected_version() {
            return Err(StoreError::Conflict {
                doc_id: doc_id.to_string(),
                expected: write.expected_version(),
                found,
            });
        }

        let stored = documents
            .entry(doc_id.to_string())
            .or_insert_with(|| StoredDocument {
                base: write.base.to_string(),
                content: write.base.to_string(),
                operations: Vec::new(),
            });
        stored.content = write.content.to_string();
        stored.operations.extend_from_slice(write.operations);
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.documents.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
