//! WebSocket editing client for integration tests
//!
//! Speaks the editing protocol over `tokio-tungstenite` and keeps a local
//! replica built from the committed operations it is sent, in version order.

use std::collections::BTreeMap;
use std::time::Duration;

use convergedoc::shared::operation::apply_all;
use convergedoc::shared::{ClientMessage, Operation, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestClient {
    ws: WsStream,
    /// Content and version from the last init
    base: String,
    base_version: u64,
    /// Committed operations received since the last init, by version
    committed: BTreeMap<u64, Operation>,
}

impl TestClient {
    /// Connect and consume the init message
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url)
            .await
            .unwrap_or_else(|e| panic!("failed to connect to {}: {}", url, e));
        let mut client = Self {
            ws,
            base: String::new(),
            base_version: 0,
            committed: BTreeMap::new(),
        };
        match client.recv().await {
            ServerMessage::Init { .. } => {}
            other => panic!("expected init, got {:?}", other),
        }
        client
    }

    /// Version of the newest committed operation this client has seen
    pub fn version(&self) -> u64 {
        self.committed
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.base_version)
    }

    /// Local replica: init content plus every committed operation seen
    pub fn content(&self) -> String {
        apply_all(&self.base, self.committed.values()).expect("committed operations must apply")
    }

    pub async fn send(&mut self, message: &ClientMessage) {
        let text = serde_json::to_string(message).expect("client message serializes");
        self.send_raw(&text).await;
    }

    pub async fn send_op(&mut self, op: Operation, base_version: u64) {
        self.send(&ClientMessage::Operation { op, base_version }).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::text(text))
            .await
            .expect("failed to send text frame");
    }

    pub async fn send_binary(&mut self, bytes: Vec<u8>) {
        self.ws
            .send(Message::binary(bytes))
            .await
            .expect("failed to send binary frame");
    }

    /// Receive the next server message and fold it into the replica
    pub async fn recv(&mut self) -> ServerMessage {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a server message")
                .expect("connection closed while waiting for a message")
                .expect("transport error");

            let text = match frame {
                Message::Text(text) => text,
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {:?}", other),
            };
            let message: ServerMessage =
                serde_json::from_str(text.as_str()).expect("server sent invalid JSON");
            self.observe(&message);
            return message;
        }
    }

    /// Receive until `count` operations (acked or broadcast) have arrived
    pub async fn recv_commits(&mut self, count: usize) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        let mut seen = 0;
        while seen < count {
            let message = self.recv().await;
            match &message {
                ServerMessage::Operation { .. } => seen += 1,
                ServerMessage::Ack { ops, .. } => seen += ops.len(),
                _ => {}
            }
            messages.push(message);
        }
        messages
    }

    /// Wait for the server to close the connection
    pub async fn expect_closed(&mut self) {
        loop {
            let frame = timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for the server to close");
            match frame {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(other)) => panic!("expected close, got {:?}", other),
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    fn observe(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Init { content, version } => {
                self.base = content.clone();
                self.base_version = *version;
                self.committed.clear();
            }
            ServerMessage::Operation { op, version } => {
                self.committed.insert(*version, op.clone());
            }
            ServerMessage::Ack { version, ops } => {
                let first = version + 1 - ops.len() as u64;
                for (offset, op) in ops.iter().enumerate() {
                    self.committed.insert(first + offset as u64, op.clone());
                }
            }
            ServerMessage::Error { .. } => {}
        }
    }
}
