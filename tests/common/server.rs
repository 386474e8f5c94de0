//! Test server helpers
//!
//! Starts the real application on `127.0.0.1:0` and keeps a clone of the
//! router so HTTP requests can also be driven in-process against the same
//! state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use convergedoc::backend::server::{create_app, ServerConfig};
use convergedoc::backend::storage::{DocumentStore, MemoryStore};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

/// A running server
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<dyn DocumentStore>,
    app: Router,
    handle: JoinHandle<()>,
}

/// Response of an in-process HTTP request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl TestResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("response is not the expected JSON ({}): {}", e, self.body))
    }
}

impl TestServer {
    /// Server with an empty in-memory store
    pub async fn start() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    /// Server with one seeded document
    pub async fn with_document(doc_id: &str, content: &str) -> Self {
        Self::with_store(Arc::new(MemoryStore::with_document(doc_id, content))).await
    }

    pub async fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(ServerConfig::default(), store).await
    }

    pub async fn with_config(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        let app = create_app(config, store.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no address");

        let served = app.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, served).await.expect("test server failed");
        });

        Self {
            addr,
            store,
            app,
            handle,
        }
    }

    /// WebSocket URL of a named document
    pub fn ws_url(&self, doc_id: &str) -> String {
        format!("ws://{}/collab/{}/ws", self.addr, doc_id)
    }

    /// WebSocket URL of the default document
    pub fn default_ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn put_json(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.request(Method::PUT, path, Some(body.to_string())).await
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("invalid test request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");

        TestResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
