//! Real-time Delivery Module
//!
//! Fan-out of committed operations to the editing sessions attached to a
//! document.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs       - Module exports
//! └── broadcast.rs - Per-document session set and message delivery
//! ```

/// Session set and message delivery
pub mod broadcast;

pub use broadcast::{SessionBroadcaster, SessionId, SessionInfo, SessionSender};
