/**
 * Editing Sessions
 *
 * One `EditingSession` per WebSocket connection. It attaches to a document,
 * turns client messages into commits, and detaches when the connection ends.
 *
 * # Lifecycle
 *
 * ```text
 * Connecting ──join──▶ Synced ◀──▶ Submitting
 *                        │
 *                        └──▶ Closed
 * ```
 *
 * A session is `Synced` once it is registered with the document and its
 * init message is queued. An `operation` message moves it to `Submitting`
 * until the commit is acked or refused. Malformed or invalid messages get an
 * `error` reply and leave the session `Synced`. Disconnects, transport
 * errors and binary frames close it.
 *
 * # Transport
 *
 * `run_socket` splits the socket. A writer task drains the session's bounded
 * queue into the socket; the reader loop feeds text frames to the session.
 * When the session leaves the document its queue sender is dropped, so the
 * writer flushes what is left, sends a close frame and exits.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::collab::document::CollabDocument;
use crate::backend::realtime::broadcast::SessionId;
use crate::shared::{ClientMessage, EditError, ServerMessage};

/// How long a closing session waits for its writer to flush
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Synced,
    Submitting,
    Closed,
}

/// Protocol state of one connection
#[derive(Debug)]
pub struct EditingSession {
    id: SessionId,
    document: Arc<CollabDocument>,
    phase: SessionPhase,
}

impl EditingSession {
    pub fn new(document: Arc<CollabDocument>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            phase: SessionPhase::Connecting,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn document(&self) -> &Arc<CollabDocument> {
        &self.document
    }

    /// Register with the document and queue the init message
    pub async fn open(&mut self, sender: mpsc::Sender<ServerMessage>) -> Result<(), EditError> {
        debug_assert_eq!(self.phase, SessionPhase::Connecting);
        match self.document.join(self.id, sender).await {
            Ok(_) => {
                self.phase = SessionPhase::Synced;
                Ok(())
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Handle one text frame
    ///
    /// Rejected messages are answered with an `error` reply. An `Err` means
    /// the session can no longer be reached and must be closed.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), EditError> {
        if self.phase == SessionPhase::Closed {
            return Err(EditError::connection_lost(self.id));
        }

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("[Session] {} sent a malformed message: {}", self.id, e);
                return self.reply_error(&e);
            }
        };

        match message {
            ClientMessage::Operation { op, base_version } => {
                self.phase = SessionPhase::Submitting;
                let result = self.document.submit(Some(self.id), vec![op], base_version).await;
                self.phase = SessionPhase::Synced;
                if let Err(e) = result {
                    return self.reply_error(&e);
                }
            }
            ClientMessage::Resync => {
                self.document.resync(self.id).await?;
            }
        }

        // The broadcaster drops sessions whose queue overflowed.
        if self.document.sessions().contains(self.id) {
            Ok(())
        } else {
            Err(EditError::connection_lost(self.id))
        }
    }

    /// Detach from the document
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Closed {
            self.document.leave(self.id);
            self.phase = SessionPhase::Closed;
        }
    }

    fn reply_error(&mut self, error: &EditError) -> Result<(), EditError> {
        self.document
            .sessions()
            .send_to(self.id, ServerMessage::error(error))
    }
}

impl Drop for EditingSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Serve one WebSocket connection on `document` until it closes
pub async fn run_socket(socket: WebSocket, document: Arc<CollabDocument>, queue_capacity: usize) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(queue_capacity);

    let mut session = EditingSession::new(document);
    let session_id = session.id();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Session] Failed to encode message for {}: {}", session_id, e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                tracing::debug!("[Session] Write to {} failed: {}", session_id, e);
                return;
            }
        }
        let _ = ws_tx.close().await;
    });

    if let Err(e) = session.open(tx).await {
        tracing::warn!("[Session] {} could not join: {}", session_id, e);
        writer.abort();
        return;
    }

    let mut writer_finished = false;
    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = session.handle_text(text.as_str()).await {
                            tracing::info!("[Session] Closing {}: {}", session_id, e);
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("[Session] {} sent a binary frame, closing", session_id);
                        break;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("[Session] {} disconnected", session_id);
                        break;
                    }
                    // axum answers pings itself
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Err(e)) => {
                        tracing::debug!("[Session] Transport error on {}: {}", session_id, e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                writer_finished = true;
                tracing::debug!("[Session] Writer for {} stopped", session_id);
                break;
            }
        }
    }

    session.close();

    if !writer_finished && tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        tracing::warn!("[Session] Writer for {} did not flush in time", session_id);
        writer.abort();
    }
}
