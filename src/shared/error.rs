//! Shared Error Types
//!
//! This module defines the errors an editing session can run into. They are
//! shared between the document core and the protocol layer, and every variant
//! maps onto an `error` message that is sent back to the client.
//!
//! # Error Categories
//!
//! - `MalformedMessage` - Unparseable message, missing fields, bad base version
//! - `OutOfRange` - Operation addresses positions outside the document
//! - `StorageFailure` - The document store refused or failed the write
//! - `ConnectionLost` - A session's outbound queue is gone or saturated
//!
//! # Usage
//!
//! ```rust
//! use convergedoc::shared::error::EditError;
//!
//! let error = EditError::malformed("missing field `op`");
//! assert!(error.is_recoverable());
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating, transforming, committing or delivering edits
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The message could not be parsed or violates the protocol
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// Human-readable error message
        reason: String,
    },

    /// The operation does not fit inside the document it targets
    #[error("Operation out of range: [{start}, {end}) exceeds document length {document_length}")]
    OutOfRange {
        /// First character addressed by the operation
        start: usize,
        /// One past the last character addressed by the operation
        end: usize,
        /// Length of the document the operation was checked against
        document_length: usize,
    },

    /// Persisting the document failed; the in-memory state is unchanged
    #[error("Storage failure: {reason}")]
    StorageFailure {
        /// Human-readable error message
        reason: String,
    },

    /// A session can no longer receive messages
    #[error("Connection lost for session {session}")]
    ConnectionLost {
        /// Session identifier
        session: String,
    },
}

/// Wire-level classification of an [`EditError`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedMessage,
    OutOfRange,
    StorageFailure,
    ConnectionLost,
}

impl EditError {
    /// Create a new malformed message error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Create a new out of range error for the span `[start, end)`
    pub fn out_of_range(start: usize, end: usize, document_length: usize) -> Self {
        Self::OutOfRange {
            start,
            end,
            document_length,
        }
    }

    /// Create a new storage failure
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::StorageFailure {
            reason: reason.into(),
        }
    }

    /// Create a new connection lost error
    pub fn connection_lost(session: impl ToString) -> Self {
        Self::ConnectionLost {
            session: session.to_string(),
        }
    }

    /// Wire classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedMessage { .. } => ErrorKind::MalformedMessage,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::StorageFailure { .. } => ErrorKind::StorageFailure,
            Self::ConnectionLost { .. } => ErrorKind::ConnectionLost,
        }
    }

    /// Whether the session that triggered the error may keep going
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConnectionLost { .. })
    }
}

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("JSON error: {}", err))
    }
}
