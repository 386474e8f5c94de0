/**
 * Error Conversion
 *
 * All backend errors implement `IntoResponse` from Axum, allowing them to be
 * returned directly from handlers.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::response::{IntoResponse, Json, Response};

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("[Collab] Request failed: {}", message);
        } else {
            tracing::debug!("[Collab] Request rejected ({}): {}", status, message);
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
