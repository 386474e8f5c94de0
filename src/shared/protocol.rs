/**
 * Editing Session Protocol Messages
 *
 * This module defines the JSON messages exchanged over an editing
 * connection, plus the snapshot and metadata types served over HTTP.
 * Every message is an object with a `type` discriminator.
 *
 * # Client to Server
 *
 * - `{"type":"operation","op":{...},"baseVersion":3}` - submit an edit
 * - `{"type":"resync"}` - ask for a fresh `init`
 *
 * # Server to Client
 *
 * - `{"type":"init","content":"...","version":3}` - full state
 * - `{"type":"operation","op":{...},"version":4}` - a peer's committed edit
 * - `{"type":"ack","version":4,"ops":[...]}` - own edit committed as `ops`
 * - `{"type":"error","kind":"out_of_range","reason":"..."}` - rejected
 */

use serde::{Deserialize, Serialize};
use crate::shared::error::{EditError, ErrorKind};
use crate::shared::operation::Operation;

/// Messages sent by editing clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit an operation generated against `base_version`
    Operation {
        op: Operation,
        #[serde(rename = "baseVersion")]
        base_version: u64,
    },
    /// Request the current document state again
    Resync,
}

/// Messages sent by the server to editing clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full document state, sent on join and on resync
    Init { content: String, version: u64 },
    /// An operation committed by another session, producing `version`
    Operation { op: Operation, version: u64 },
    /// The submitter's own operation was committed as `ops`, ending at `version`
    Ack { version: u64, ops: Vec<Operation> },
    /// The last message was rejected
    Error { kind: ErrorKind, reason: String },
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, EditError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ServerMessage {
    /// Create an init message from a snapshot
    pub fn init(snapshot: &DocumentSnapshot) -> Self {
        Self::Init {
            content: snapshot.content.clone(),
            version: snapshot.version,
        }
    }

    /// Create an error reply
    pub fn error(error: &EditError) -> Self {
        Self::Error {
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// Serialize for a text frame
    pub fn to_json(&self) -> Result<String, EditError> {
        serde_json::to_string(self).map_err(|e| EditError::malformed(e.to_string()))
    }
}

/// Document state snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSnapshot {
    /// The document content
    pub content: String,
    /// Number of operations committed so far
    pub version: u64,
}

/// Document metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Document ID
    pub id: String,
    /// Current version
    pub version: u64,
    /// Length of the content in characters
    pub length: usize,
    /// Number of entries in the operation log
    pub operation_count: usize,
    /// Editing sessions currently attached
    pub session_count: usize,
}

/// Request to overwrite a document's content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplaceContentRequest {
    pub content: String,
}

/// Response after committing operations outside a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitResponse {
    /// Version after the commit
    pub version: u64,
    /// Operations as they were committed
    pub ops: Vec<Operation>,
}
