//! Integration tests against a running server

pub mod sqlite_store_test;
pub mod websocket_test;
