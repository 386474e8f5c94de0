//! Backend Error Module
//!
//! This module defines error types specific to the backend server.
//! These errors are used in HTTP handlers and can be converted to HTTP responses.
//!
//! # Architecture
//!
//! The error module is organized into focused submodules:
//!
//! - **`types`** - Error type definitions and constructors
//! - **`conversion`** - Error conversion implementations (IntoResponse, etc.)
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - Error conversion implementations
//! ```
//!
//! # Error Types
//!
//! - `EditError` - Errors from the editing core
//! - `StoreError` - Errors from the document store
//!
//! # HTTP Response Conversion
//!
//! All backend errors implement `IntoResponse` from Axum, allowing them to be
//! returned directly from handlers. The error is automatically converted to an
//! appropriate HTTP status code and JSON response body.
//!
//! # Example
//!
//! ```rust,no_run
//! use convergedoc::backend::error::BackendError;
//! use convergedoc::shared::EditError;
//!
//! async fn handler() -> Result<String, BackendError> {
//!     Err(EditError::malformed("missing content").into())
//! }
//! ```

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use types::BackendError;

