//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs           - Module exports and documentation
//! ├── router.rs        - Main router creation, middleware, fallback
//! └── collab_routes.rs - Editing session and document routes
//! ```
//!
//! # Routes
//!
//! - `GET /` - Health check
//! - `GET /ws` - Editing session on the default document
//! - `GET /collab` - Known document ids
//! - `GET /collab/{doc_id}` - Snapshot
//! - `PUT /collab/{doc_id}` - Replace content
//! - `GET /collab/{doc_id}/meta` - Metadata
//! - `GET /collab/{doc_id}/ws` - Editing session on a named document

/// Main router creation
pub mod router;

/// Collaborative editing routes
pub mod collab_routes;

// Re-export commonly used functions
pub use router::create_router;
