/**
 * Collaborative Editing Routes
 *
 * ## WebSocket
 * - `GET /ws` - Editing session on the default document
 * - `GET /collab/{doc_id}/ws` - Editing session on a named document
 *
 * ## HTTP
 * - `GET /collab` - Known document ids
 * - `GET /collab/{doc_id}` - Snapshot
 * - `PUT /collab/{doc_id}` - Replace content
 * - `GET /collab/{doc_id}/meta` - Metadata
 */

use axum::{routing::get, Router};

use crate::backend::collab::handlers::{
    handle_collab_get, handle_collab_list, handle_collab_meta, handle_collab_put,
    handle_collab_ws, handle_default_ws,
};
use crate::backend::server::state::AppState;

/// Add the collaborative editing routes to `router`
pub fn configure_collab_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/ws", get(handle_default_ws))
        .route("/collab", get(handle_collab_list))
        .route("/collab/{doc_id}", get(handle_collab_get).put(handle_collab_put))
        .route("/collab/{doc_id}/meta", get(handle_collab_meta))
        .route("/collab/{doc_id}/ws", get(handle_collab_ws))
}
