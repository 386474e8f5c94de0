//! Shared Module
//!
//! This module contains the editing core that does not depend on the server:
//! the operation type, the transform engine, the wire protocol and the error
//! taxonomy. None of it touches the network or the database, so it can be
//! embedded in clients as well.
//!
//! # Overview
//!
//! - **`operation`** - Insert/delete primitive and how it applies to text
//! - **`transform`** - Operational transformation of concurrent operations
//! - **`protocol`** - JSON messages exchanged with editing clients
//! - **`error`** - Error taxonomy shared by every layer

/// Text operations
pub mod operation;

/// Operational transformation
pub mod transform;

/// Editing session protocol messages
pub mod protocol;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use operation::Operation;
pub use transform::{transform_against, transform_pair, transform_sequences};
pub use protocol::{ClientMessage, ServerMessage, DocumentSnapshot, DocumentMetadata, CommitResponse, ReplaceContentRequest};
pub use error::{EditError, ErrorKind};
