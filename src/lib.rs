//! convergedoc - Collaborative Document Editing Server
//!
//! A server that lets several clients edit one plain-text document at the
//! same time over WebSocket. Every client submits single insert or delete
//! operations against the version it last saw; the server transforms them
//! against whatever was committed since, commits them in one total order,
//! and broadcasts them so every client converges on the same text.
//!
//! # Module Structure
//!
//! - **`shared`** - The editing core with no server dependencies
//!   - Operation type and how it applies to text
//!   - Operational transformation
//!   - Wire protocol messages
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP and WebSocket server
//!   - Per-document state, commit critical section, session broadcasting
//!   - Document stores (memory, PostgreSQL, SQLite)
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server build (enables the `backend` module and the server
//!   binary). On by default.
//!
//! # Positions
//!
//! Operation positions and lengths count Unicode scalar values (`char`s),
//! not bytes.
//!
//! # Example
//!
//! ```rust
//! use convergedoc::shared::{transform_pair, Operation};
//!
//! let mine = Operation::insert(5, "!");
//! let theirs = Operation::delete(0, 5);
//! let (rebased, _) = transform_pair(&mine, &theirs);
//! assert_eq!(rebased, vec![Operation::insert(0, "!")]);
//! ```

/// Shared types and the editing core
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
