/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct serves as the central state container for the
 * application, holding:
 * - The registry of open documents (`CollabState`), which owns the store
 * - The server configuration
 *
 * # State Extraction
 *
 * The `FromRef` implementations allow Axum handlers to extract specific
 * parts of the state without needing the entire `AppState`.
 *
 * ```rust
 * use convergedoc::backend::collab::state::CollabState;
 * use axum::extract::State;
 *
 * async fn handler(State(collab): State<CollabState>) {
 *     let open = collab.open_count().await;
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::collab::state::CollabState;
use crate::backend::server::config::ServerConfig;
use crate::backend::storage::DocumentStore;

/// Application state shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Open documents, loaded from the store on first use
    pub collab_state: CollabState,

    /// Configuration the server was started with
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            collab_state: CollabState::new(store),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for CollabState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.collab_state.clone()
    }
}

impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
