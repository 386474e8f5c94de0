/**
 * Session Broadcasting
 *
 * This module keeps the set of editing sessions attached to one document and
 * delivers server messages to them.
 *
 * # Delivery
 *
 * Every session owns a bounded `tokio::sync::mpsc` queue drained by its
 * socket writer task. Messages are queued with `try_send`, so broadcasting
 * never waits on a client. A session whose queue is full or closed is
 * dropped from the set and reported as `ConnectionLost`; the remaining
 * sessions keep receiving.
 *
 * Sends happen from inside the document's commit critical section, which
 * gives every session the committed operations in version order.
 */

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::shared::{EditError, ServerMessage};

/// Identifier of one editing session
pub type SessionId = Uuid;

/// Outgoing queue of one session
pub type SessionSender = mpsc::Sender<ServerMessage>;

#[derive(Debug)]
struct SessionEntry {
    sender: SessionSender,
    last_known_version: u64,
}

/// Snapshot of one attached session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    /// Last version the session was told about
    pub last_known_version: u64,
}

/// Sessions attached to one document
#[derive(Debug, Default)]
pub struct SessionBroadcaster {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl SessionBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a session that has seen `version`
    pub fn register(&self, id: SessionId, sender: SessionSender, version: u64) {
        self.sessions.lock().insert(
            id,
            SessionEntry {
                sender,
                last_known_version: version,
            },
        );
    }

    /// Detach a session; returns whether it was attached
    pub fn unregister(&self, id: SessionId) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }

    /// Queue `message` for one session
    ///
    /// A session that cannot take the message is detached.
    pub fn send_to(&self, id: SessionId, message: ServerMessage) -> Result<(), EditError> {
        let mut sessions = self.sessions.lock();
        let Some(entry) = sessions.get(&id) else {
            return Err(EditError::connection_lost(id));
        };

        match entry.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                sessions.remove(&id);
                log_drop(id, &e);
                Err(EditError::connection_lost(id))
            }
        }
    }

    /// Queue `message`, produced at `version`, for every session except
    /// `origin`; returns how many sessions accepted it
    pub fn broadcast(&self, origin: Option<SessionId>, message: &ServerMessage, version: u64) -> usize {
        let mut sessions = self.sessions.lock();
        let mut lost = Vec::new();
        let mut delivered = 0;

        for (id, entry) in sessions.iter_mut() {
            if Some(*id) == origin {
                continue;
            }
            match entry.sender.try_send(message.clone()) {
                Ok(()) => {
                    entry.last_known_version = version;
                    delivered += 1;
                }
                Err(e) => {
                    log_drop(*id, &e);
                    lost.push(*id);
                }
            }
        }

        for id in lost {
            sessions.remove(&id);
        }

        tracing::debug!("[Broadcast] Version {} delivered to {} session(s)", version, delivered);
        delivered
    }

    /// Record that `id` has seen `version`
    pub fn mark_synced(&self, id: SessionId, version: u64) {
        if let Some(entry) = self.sessions.lock().get_mut(&id) {
            entry.last_known_version = version;
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: *id,
                last_known_version: entry.last_known_version,
            })
            .collect()
    }

    /// Drop sessions whose writer has gone away; returns how many
    pub fn prune_closed(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.sender.is_closed());
        before - sessions.len()
    }
}

fn log_drop(id: SessionId, error: &TrySendError<ServerMessage>) {
    match error {
        TrySendError::Full(_) => {
            tracing::warn!("[Broadcast] Session {} is not keeping up, dropping it", id)
        }
        TrySendError::Closed(_) => {
            tracing::debug!("[Broadcast] Session {} already closed, dropping it", id)
        }
    }
}
