/**
 * Collaborative Editing Handlers
 *
 * This module implements the HTTP surface of the editing server:
 * - GET /ws - Editing session on the default document
 * - GET /collab/{doc_id}/ws - Editing session on a named document
 * - GET /collab/{doc_id} - Current content and version
 * - PUT /collab/{doc_id} - Replace the whole content
 * - GET /collab/{doc_id}/meta - Version, length and attached sessions
 * - GET /collab - Known document ids
 * - GET / - Health check
 */

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::{IntoResponse, Json, Response},
};

use crate::backend::collab::session::run_socket;
use crate::backend::collab::state::CollabState;
use crate::backend::error::BackendError;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;
use crate::shared::{CommitResponse, DocumentMetadata, DocumentSnapshot, ReplaceContentRequest};

/// Health check (GET /)
pub async fn handle_health() -> &'static str {
    "Server is running"
}

/// Open an editing session on the default document (GET /ws)
pub async fn handle_default_ws(
    State(app_state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    let doc_id = app_state.config.default_document.clone();
    upgrade(&app_state.collab_state, &app_state.config, &doc_id, ws).await
}

/// Open an editing session on a named document (GET /collab/{doc_id}/ws)
pub async fn handle_collab_ws(
    State(app_state): State<AppState>,
    Path(doc_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    upgrade(&app_state.collab_state, &app_state.config, &doc_id, ws).await
}

async fn upgrade(
    collab_state: &CollabState,
    config: &Arc<ServerConfig>,
    doc_id: &str,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    tracing::info!("[Collab] WebSocket request for document: {}", doc_id);

    // Open before upgrading, so a store failure is an HTTP error instead of
    // a socket that closes straight away.
    let document = collab_state.get_or_open(doc_id).await?;
    let capacity = config.session_queue_capacity;

    Ok(ws
        .on_upgrade(move |socket| run_socket(socket, document, capacity))
        .into_response())
}

/// Current content and version (GET /collab/{doc_id})
///
/// Read-only requests do not keep the document open.
pub async fn handle_collab_get(
    State(collab_state): State<CollabState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentSnapshot>, BackendError> {
    let document = collab_state.open_detached(&doc_id).await?;
    Ok(Json(document.load().await))
}

/// Replace the whole content (PUT /collab/{doc_id})
///
/// Attached sessions receive the resulting operations like any other commit.
pub async fn handle_collab_put(
    State(collab_state): State<CollabState>,
    Path(doc_id): Path<String>,
    Json(request): Json<ReplaceContentRequest>,
) -> Result<Json<CommitResponse>, BackendError> {
    tracing::info!("[Collab] PUT request for document: {}", doc_id);

    let document = collab_state.get_or_open(&doc_id).await?;
    let outcome = document.replace_content(&request.content).await?;

    Ok(Json(CommitResponse {
        version: outcome.version,
        ops: outcome.operations(),
    }))
}

/// Document metadata (GET /collab/{doc_id}/meta)
pub async fn handle_collab_meta(
    State(collab_state): State<CollabState>,
    Path(doc_id): Path<String>,
) -> Result<Json<DocumentMetadata>, BackendError> {
    let document = collab_state.open_detached(&doc_id).await?;
    Ok(Json(document.metadata().await))
}

/// Stored documents and documents being edited (GET /collab)
pub async fn handle_collab_list(
    State(collab_state): State<CollabState>,
) -> Result<Json<Vec<String>>, BackendError> {
    Ok(Json(collab_state.list_documents().await?))
}
