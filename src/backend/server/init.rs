/**
 * Server Initialization
 *
 * This module builds the Axum application from a configuration and a
 * document store.
 *
 * # Initialization Process
 *
 * 1. Create the application state (document registry and configuration)
 * 2. Create the router with all routes and middleware
 * 3. Start the periodic cleanup task for dead sessions and idle documents
 *
 * Documents are not loaded here. Each one is restored from the store the
 * first time a session or request asks for it, and closed again by the
 * cleanup task once nothing uses it.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;
use crate::backend::storage::DocumentStore;

/// How often dead sessions and idle documents are swept
pub const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
///
/// Must be called from inside a tokio runtime, since it spawns the cleanup
/// task.
pub fn create_app(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Router<()> {
    tracing::info!(
        "Initializing convergedoc server ({} store, default document '{}')",
        store.backend_name(),
        config.default_document
    );

    let app_state = AppState::new(config, store);
    let app = create_router(app_state.clone());

    // Writers that died without their session leaving are normally caught on
    // the next send; this catches documents that see no more commits.
    let cleanup_state = app_state.collab_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let pruned = cleanup_state.prune_closed_sessions().await;
            if pruned > 0 {
                tracing::debug!("[Session] Cleaned up {} closed session(s)", pruned);
            }
            cleanup_state.evict_idle_documents().await;
        }
    });

    tracing::info!("Router configured with periodic session and document cleanup task");

    app
}
