/**
 * Backend Error Types
 *
 * This module defines error types specific to the backend server.
 * These errors are used in HTTP handlers and can be converted to HTTP responses.
 *
 * # Error Types
 *
 * - `EditError` - Rejected edits and failed commits from the editing core
 * - `StoreError` - Storage backend failures outside a commit, such as listing
 *
 * # Status Mapping
 *
 * Edit errors keep their meaning over HTTP: a malformed request is a 400,
 * an out-of-range operation a 422, a failed commit a 503. A store that
 * cannot be read is a 503 as well. Inside a commit every store error,
 * version conflicts included, surfaces as a `StorageFailure`.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::storage::StoreError;
use crate::shared::EditError;

/// Backend-specific error types
///
/// ```rust
/// use convergedoc::backend::error::BackendError;
/// use convergedoc::shared::EditError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::from(EditError::malformed("Invalid request"));
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from the editing core
    #[error(transparent)]
    EditError(#[from] EditError),

    /// Error from the document store
    #[error(transparent)]
    StoreError(#[from] StoreError),
}

impl BackendError {
    /// Get the HTTP status code for this error
    ///
    /// - `EditError` - 400, 422, 503 or 500 depending on the kind
    /// - `StoreError` - 503 Service Unavailable
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::EditError(err) => match err {
                EditError::MalformedMessage { .. } => StatusCode::BAD_REQUEST,
                EditError::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EditError::StorageFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
                EditError::ConnectionLost { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::StoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::EditError(err) => err.to_string(),
            Self::StoreError(err) => err.to_string(),
        }
    }
}
