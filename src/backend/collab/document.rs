/**
 * Collaborative Document
 *
 * This module owns the authoritative state of one shared document and the
 * commit critical section every edit goes through.
 *
 * # Commit Critical Section
 *
 * `CollabDocument::submit` holds the document mutex for the whole sequence
 *
 * 1. check the base version and validate the operations against it
 * 2. transform them against every operation committed since
 * 3. apply them to a scratch copy of the content
 * 4. persist through the `DocumentStore`
 * 5. swap in the new content, append to the log, bump the version
 * 6. queue the ack to the origin and the broadcast to every other session
 *
 * A failure in steps 1 to 4 leaves the state exactly as it was. The tokio mutex
 * is fair, so concurrent submissions are processed in arrival order. Queuing
 * in step 6 never waits on a client, so a slow peer cannot stall a commit.
 */

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::backend::realtime::broadcast::{SessionBroadcaster, SessionId};
use crate::backend::storage::{DocumentStore, PendingWrite, StoredDocument};
use crate::shared::operation::{apply_all, char_len};
use crate::shared::transform::transform_against;
use crate::shared::{DocumentMetadata, DocumentSnapshot, EditError, Operation, ServerMessage};

/// A committed operation and the version it produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub version: u64,
    pub operation: Operation,
    pub committed_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(version: u64, operation: Operation) -> Self {
        Self {
            version,
            operation,
            committed_at: Utc::now(),
        }
    }
}

/// Replay `entries` over `base`
pub fn replay(base: &str, entries: &[LogEntry]) -> Result<String, EditError> {
    apply_all(base, entries.iter().map(|entry| &entry.operation))
}

/// Operations that passed validation, transform and application, ready to
/// be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommit {
    content: String,
    length: usize,
    entries: Vec<LogEntry>,
}

impl PreparedCommit {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The transform reduced the submission to nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Authoritative content, version and operation log of one document
///
/// Invariants: `version == log.len()`, and replaying `log` over `base`
/// yields `content`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentState {
    base: String,
    content: String,
    length: usize,
    version: u64,
    log: Vec<LogEntry>,
}

impl DocumentState {
    /// Empty document at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Document seeded with `base` at version 0
    pub fn with_content(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            length: char_len(&base),
            content: base.clone(),
            base,
            version: 0,
            log: Vec::new(),
        }
    }

    /// Rebuild state from what the store returned
    ///
    /// The log must be numbered 1..=n and replay to the stored content.
    pub fn restore(stored: StoredDocument) -> Result<Self, EditError> {
        for (index, entry) in stored.operations.iter().enumerate() {
            if entry.version != index as u64 + 1 {
                return Err(EditError::storage(format!(
                    "operation log gap: entry {} has version {}",
                    index, entry.version
                )));
            }
        }

        let replayed = replay(&stored.base, &stored.operations)
            .map_err(|e| EditError::storage(format!("operation log does not replay: {}", e)))?;
        if replayed != stored.content {
            return Err(EditError::storage(
                "stored content does not match its operation log",
            ));
        }

        Ok(Self {
            length: char_len(&stored.content),
            version: stored.operations.len() as u64,
            base: stored.base,
            content: stored.content,
            log: stored.operations,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Content length in characters
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            content: self.content.clone(),
            version: self.version,
        }
    }

    /// Log entries committed after `version`
    pub fn entries_since(&self, version: u64) -> &[LogEntry] {
        let start = (version as usize).min(self.log.len());
        &self.log[start..]
    }

    /// Content length, in characters, as it was at `version`
    pub fn length_at(&self, version: u64) -> Result<usize, EditError> {
        if version > self.version {
            return Err(EditError::malformed(format!(
                "base version {} is ahead of document version {}",
                version, self.version
            )));
        }
        let delta: isize = self
            .entries_since(version)
            .iter()
            .map(|entry| entry.operation.len_delta())
            .sum();
        Ok((self.length as isize - delta) as usize)
    }

    /// Validate, transform and apply `ops` (generated against `base_version`)
    /// without touching the state
    pub fn prepare(&self, ops: &[Operation], base_version: u64) -> Result<PreparedCommit, EditError> {
        let mut length = self.length_at(base_version)?;
        for op in ops {
            op.validate(length)?;
            length = (length as isize + op.len_delta()) as usize;
        }

        let missed = self.entries_since(base_version);
        let transformed = if missed.is_empty() {
            ops.to_vec()
        } else {
            transform_against(ops, missed.iter().map(|entry| &entry.operation))
        };

        let mut content = self.content.clone();
        let mut length = self.length;
        let mut version = self.version;
        let mut entries = Vec::with_capacity(transformed.len());
        for op in transformed {
            op.validate(length)?;
            op.apply_to(&mut content)?;
            length = (length as isize + op.len_delta()) as usize;
            version += 1;
            entries.push(LogEntry::new(version, op));
        }

        Ok(PreparedCommit {
            content,
            length,
            entries,
        })
    }

    /// Install a prepared commit; returns the new version
    ///
    /// `prepared` must come from `prepare` on this state with no commit in
    /// between.
    pub fn apply_prepared(&mut self, prepared: PreparedCommit) -> u64 {
        debug_assert!(prepared
            .entries
            .first()
            .map_or(true, |entry| entry.version == self.version + 1));
        self.content = prepared.content;
        self.length = prepared.length;
        self.version += prepared.entries.len() as u64;
        self.log.extend(prepared.entries);
        self.version
    }
}

/// Result of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Document version after the commit
    pub version: u64,
    /// Entries appended, empty when the submission transformed into nothing
    pub entries: Vec<LogEntry>,
}

impl CommitOutcome {
    pub fn operations(&self) -> Vec<Operation> {
        self.entries.iter().map(|entry| entry.operation.clone()).collect()
    }
}

/// One shared document: its state, its editing sessions and its store
pub struct CollabDocument {
    id: String,
    state: Mutex<DocumentState>,
    sessions: SessionBroadcaster,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for CollabDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabDocument")
            .field("id", &self.id)
            .field("sessions", &self.sessions.session_count())
            .field("store", &self.store.backend_name())
            .finish()
    }
}

impl CollabDocument {
    pub fn new(id: impl Into<String>, state: DocumentState, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(state),
            sessions: SessionBroadcaster::new(),
            store,
        }
    }

    /// Load `id` from the store, or start an empty document if it was never
    /// saved
    pub async fn open(id: impl Into<String>, store: Arc<dyn DocumentStore>) -> Result<Self, EditError> {
        let id = id.into();
        let state = match store.load_document(&id).await? {
            Some(stored) => {
                let state = DocumentState::restore(stored)?;
                tracing::info!(
                    "[Collab] Loaded document '{}' at version {} from {}",
                    id,
                    state.version(),
                    store.backend_name()
                );
                state
            }
            None => {
                tracing::info!("[Collab] No stored state for '{}', starting empty", id);
                DocumentState::new()
            }
        };
        Ok(Self::new(id, state, store))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sessions(&self) -> &SessionBroadcaster {
        &self.sessions
    }

    /// Current `(content, version)`
    pub async fn load(&self) -> DocumentSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Run `f` against the current state
    pub async fn inspect<R>(&self, f: impl FnOnce(&DocumentState) -> R) -> R {
        f(&*self.state.lock().await)
    }

    /// Attach a session and queue its init message
    ///
    /// Registration and the snapshot happen under the document lock, so the
    /// session sees every commit after its init.
    pub async fn join(
        &self,
        session_id: SessionId,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<DocumentSnapshot, EditError> {
        let state = self.state.lock().await;
        let snapshot = state.snapshot();
        self.sessions.register(session_id, sender, snapshot.version);
        self.sessions.send_to(session_id, ServerMessage::init(&snapshot))?;
        tracing::info!(
            "[Collab] Session {} joined '{}' at version {} ({} attached)",
            session_id,
            self.id,
            snapshot.version,
            self.sessions.session_count()
        );
        Ok(snapshot)
    }

    /// Queue a fresh init for an attached session
    pub async fn resync(&self, session_id: SessionId) -> Result<DocumentSnapshot, EditError> {
        let state = self.state.lock().await;
        let snapshot = state.snapshot();
        self.sessions.send_to(session_id, ServerMessage::init(&snapshot))?;
        self.sessions.mark_synced(session_id, snapshot.version);
        tracing::debug!("[Collab] Session {} resynced at version {}", session_id, snapshot.version);
        Ok(snapshot)
    }

    /// Detach a session
    pub fn leave(&self, session_id: SessionId) {
        if self.sessions.unregister(session_id) {
            tracing::info!(
                "[Collab] Session {} left '{}' ({} attached)",
                session_id,
                self.id,
                self.sessions.session_count()
            );
        }
    }

    /// Commit `ops`, generated against `base_version`, on behalf of `origin`
    ///
    /// `origin` receives an ack, every other session the committed
    /// operations. `None` is used for edits that come from outside any
    /// session, which are broadcast to everyone.
    pub async fn submit(
        &self,
        origin: Option<SessionId>,
        ops: Vec<Operation>,
        base_version: u64,
    ) -> Result<CommitOutcome, EditError> {
        let mut state = self.state.lock().await;
        self.commit_locked(&mut state, origin, &ops, base_version).await
    }

    /// Overwrite the whole content
    ///
    /// The replacing operations are built and committed under one hold of
    /// the document lock, so the content at the returned version is exactly
    /// `content`.
    pub async fn replace_content(&self, content: &str) -> Result<CommitOutcome, EditError> {
        let mut state = self.state.lock().await;
        let mut ops = Vec::with_capacity(2);
        if !state.is_empty() {
            ops.push(Operation::delete(0, state.len()));
        }
        if !content.is_empty() {
            ops.push(Operation::insert(0, content));
        }
        let version = state.version();
        self.commit_locked(&mut state, None, &ops, version).await
    }

    /// The commit critical section; `state` is the locked document state
    async fn commit_locked(
        &self,
        state: &mut DocumentState,
        origin: Option<SessionId>,
        ops: &[Operation],
        base_version: u64,
    ) -> Result<CommitOutcome, EditError> {
        let prepared = state.prepare(ops, base_version).map_err(|e| {
            tracing::warn!("[Collab] Rejected submission on '{}': {}", self.id, e);
            e
        })?;

        if prepared.is_empty() {
            tracing::debug!(
                "[Collab] Submission on '{}' against version {} transformed into a no-op",
                self.id,
                base_version
            );
            let version = state.version();
            self.acknowledge(origin, version, Vec::new());
            return Ok(CommitOutcome {
                version,
                entries: Vec::new(),
            });
        }

        let write = PendingWrite {
            base: state.base(),
            content: prepared.content(),
            operations: prepared.entries(),
        };
        if let Err(e) = self.store.save_document(&self.id, write).await {
            tracing::error!("[Storage] Failed to persist '{}': {}", self.id, e);
            return Err(e.into());
        }

        let entries = prepared.entries.clone();
        let version = state.apply_prepared(prepared);
        tracing::info!(
            "[Collab] Committed {} operation(s) on '{}' (base {}, now version {})",
            entries.len(),
            self.id,
            base_version,
            version
        );

        let outcome = CommitOutcome { version, entries };
        self.acknowledge(origin, version, outcome.operations());
        for entry in &outcome.entries {
            let message = ServerMessage::Operation {
                op: entry.operation.clone(),
                version: entry.version,
            };
            self.sessions.broadcast(origin, &message, entry.version);
        }

        Ok(outcome)
    }

    pub async fn metadata(&self) -> DocumentMetadata {
        let state = self.state.lock().await;
        DocumentMetadata {
            id: self.id.clone(),
            version: state.version(),
            length: state.len(),
            operation_count: state.log().len(),
            session_count: self.sessions.session_count(),
        }
    }

    fn acknowledge(&self, origin: Option<SessionId>, version: u64, ops: Vec<Operation>) {
        let Some(origin) = origin else {
            return;
        };
        match self.sessions.send_to(origin, ServerMessage::Ack { version, ops }) {
            Ok(()) => self.sessions.mark_synced(origin, version),
            // The commit stands even if its author is gone.
            Err(e) => tracing::debug!("[Collab] Ack not delivered: {}", e),
        }
    }
}
