//! Collaborative Editing Module
//!
//! This module contains all server-side functionality for collaborative text
//! editing. It includes:
//! - Authoritative per-document state and the commit critical section
//! - The registry of open documents
//! - WebSocket editing sessions
//! - HTTP handlers for snapshots, replacement and metadata
//!
//! # Architecture
//!
//! - **`document`** - `DocumentState`, `CollabDocument` and commits
//! - **`state`** - `CollabState`, documents keyed by id, loaded once
//! - **`session`** - Editing session protocol over a WebSocket
//! - **`handlers`** - Axum handlers (`/ws`, `/collab/{doc_id}`, ...)
//!
//! # Example
//!
//! ```rust,no_run
//! use convergedoc::backend::collab::state::CollabState;
//! use convergedoc::shared::Operation;
//!
//! # async fn example() -> Result<(), convergedoc::shared::EditError> {
//! let state = CollabState::default();
//! let doc = state.get_or_open("doc-123").await?;
//! let outcome = doc.submit(None, vec![Operation::insert(0, "hello")], 0).await?;
//! assert_eq!(outcome.version, 1);
//! # Ok(())
//! # }
//! ```

/// Document state and commits
pub mod document;

/// Open document registry
pub mod state;

/// WebSocket editing sessions
pub mod session;

/// HTTP handlers for collaborative editing
pub mod handlers;

/// Re-export commonly used types
pub use document::{CollabDocument, CommitOutcome, DocumentState, LogEntry};
pub use state::CollabState;
pub use session::{EditingSession, SessionPhase};
