//! Server Module
//!
//! This module contains the server-side code for initializing and configuring
//! the Axum HTTP server.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Configuration loading and store selection
//! - **`init`** - Server initialization and app creation
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - ServerConfig, ConfigError, load_store
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env`
//! 2. **Store Selection**: `load_store` (memory, PostgreSQL or SQLite)
//! 3. **App Creation**: `create_app` builds state, router and background tasks
//!
//! # Example
//!
//! ```rust,no_run
//! use convergedoc::backend::server::{create_app, load_store, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let store = load_store(&config).await;
//! let app = create_app(config, store);
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::{load_store, ConfigError, ServerConfig};
pub use init::create_app;
pub use state::AppState;
