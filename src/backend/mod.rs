//! Backend Module
//!
//! This module contains all server-side code for the collaborative editing
//! server: an Axum HTTP server that hosts WebSocket editing sessions on
//! shared documents and persists every commit.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`collab`** - Documents, commits, editing sessions and their handlers
//! - **`realtime`** - Delivery of committed operations to attached sessions
//! - **`storage`** - Document stores (memory, PostgreSQL, SQLite)
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── collab/         - Collaborative editing
//! ├── realtime/       - Session broadcasting
//! ├── storage/        - Persistence
//! └── error/          - Error types
//! ```
//!
//! # Concurrency
//!
//! Each open document has its own commit mutex; documents never contend with
//! each other. Committed operations are queued to sessions without waiting on
//! them, and each connection's writer task drains its own queue.
//!
//! # Example
//!
//! ```rust,no_run
//! use convergedoc::backend::server::{create_app, ServerConfig};
//! use convergedoc::backend::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app(ServerConfig::default(), Arc::new(MemoryStore::new()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Collaborative editing
pub mod collab;

/// Real-time delivery to editing sessions
pub mod realtime;

/// Document persistence
pub mod storage;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use collab::state::CollabState;
pub use error::BackendError;
pub use server::create_app;
