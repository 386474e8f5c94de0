/**
 * Collaborative Editing State Management
 *
 * This module keeps the registry of open documents. Each document is loaded
 * from the store the first time it is asked for and then shared, as an
 * `Arc<CollabDocument>`, by every session and HTTP handler that touches it.
 */

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use crate::backend::collab::document::CollabDocument;
use crate::backend::storage::{DocumentStore, MemoryStore, StoreError};
use crate::shared::EditError;

/// Longest accepted document id
pub const MAX_DOCUMENT_ID_LEN: usize = 128;

/// Check that `doc_id` is usable as a document id
///
/// Ids are 1 to 128 ASCII letters, digits, `-`, `_` or `.`.
pub fn validate_document_id(doc_id: &str) -> Result<(), EditError> {
    if doc_id.is_empty() || doc_id.len() > MAX_DOCUMENT_ID_LEN {
        return Err(EditError::malformed(format!(
            "document id must be 1 to {} characters",
            MAX_DOCUMENT_ID_LEN
        )));
    }
    if let Some(bad) = doc_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(EditError::malformed(format!(
            "document id contains invalid character {:?}",
            bad
        )));
    }
    Ok(())
}

/// Slot for one document; empty while the document is being loaded
type DocumentSlot = Arc<OnceCell<Arc<CollabDocument>>>;

/// Collaborative editing state managed by the server
///
/// Cloning is cheap and every clone shares the same registry. The registry
/// lock is only held to look up or insert a slot; loading a document from the
/// store happens outside it, so a slow load never blocks other documents.
#[derive(Clone)]
pub struct CollabState {
    documents: Arc<RwLock<HashMap<String, DocumentSlot>>>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for CollabState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabState")
            .field("store", &self.store.backend_name())
            .finish_non_exhaustive()
    }
}

impl CollabState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Get an open document, loading it from the store on first use
    ///
    /// A document is loaded at most once; concurrent callers for the same id
    /// wait on the same load and get the same instance.
    pub async fn get_or_open(&self, doc_id: &str) -> Result<Arc<CollabDocument>, EditError> {
        validate_document_id(doc_id)?;

        if let Some(doc) = self.get_document(doc_id).await {
            return Ok(doc);
        }

        let slot = {
            let mut docs = self.documents.write().await;
            docs.entry(doc_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let store = self.store.clone();
        let opened = slot
            .get_or_try_init(|| async move {
                CollabDocument::open(doc_id, store).await.map(Arc::new)
            })
            .await
            .cloned();

        match opened {
            Ok(doc) => {
                tracing::debug!("[Collab] Opened document '{}'", doc_id);
                Ok(doc)
            }
            Err(e) => {
                let mut docs = self.documents.write().await;
                let failed = docs
                    .get(doc_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot) && !current.initialized());
                if failed {
                    docs.remove(doc_id);
                }
                Err(e)
            }
        }
    }

    /// Get a document only if it is already open
    pub async fn get_document(&self, doc_id: &str) -> Option<Arc<CollabDocument>> {
        self.documents
            .read()
            .await
            .get(doc_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Get the open instance of a document, or a detached copy loaded from
    /// the store
    ///
    /// A detached copy is not registered, so read-only requests for
    /// documents nobody is editing leave nothing behind. It must not be
    /// edited: commits go through `get_or_open`.
    pub async fn open_detached(&self, doc_id: &str) -> Result<Arc<CollabDocument>, EditError> {
        validate_document_id(doc_id)?;
        match self.get_document(doc_id).await {
            Some(doc) => Ok(doc),
            None => Ok(Arc::new(CollabDocument::open(doc_id, self.store.clone()).await?)),
        }
    }

    /// Ids of every stored document and every open document being edited
    pub async fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = self.store.list_documents().await?;
        ids.extend(self.documents.read().await.iter().filter_map(|(id, slot)| {
            slot.get()
                .filter(|doc| !doc.sessions().is_empty())
                .map(|_| id.clone())
        }));
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Number of open documents
    pub async fn open_count(&self) -> usize {
        self.documents
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Drop sessions whose connection is gone from every open document;
    /// returns how many were removed
    pub async fn prune_closed_sessions(&self) -> usize {
        let docs = self.documents.read().await;
        docs.values()
            .filter_map(|slot| slot.get())
            .map(|doc| doc.sessions().prune_closed())
            .sum()
    }

    /// Close documents nobody is using; returns how many were closed
    ///
    /// A document is idle when it has no attached session and no handle
    /// outside the registry. Committed state is already in the store, so an
    /// evicted document is simply reloaded on next use.
    pub async fn evict_idle_documents(&self) -> usize {
        let mut docs = self.documents.write().await;
        let before = docs.len();
        docs.retain(|_, slot| {
            let idle = Arc::strong_count(slot) == 1
                && slot
                    .get()
                    .is_some_and(|doc| Arc::strong_count(doc) == 1 && doc.sessions().is_empty());
            !idle
        });
        let evicted = before - docs.len();
        if evicted > 0 {
            tracing::debug!("[Collab] Closed {} idle document(s), {} still open", evicted, docs.len());
        }
        evicted
    }
}

impl Default for CollabState {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}
