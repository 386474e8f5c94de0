//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A test server on an ephemeral port
//! - A WebSocket editing client
//! - Custom assertion macros
//! - Operation generators for property tests

pub mod assertions;
#[cfg(feature = "ssr")]
pub mod client;
pub mod generators;
#[cfg(feature = "ssr")]
pub mod server;

// Re-export commonly used utilities
#[cfg(feature = "ssr")]
pub use client::*;
pub use generators::*;
#[cfg(feature = "ssr")]
pub use server::*;
