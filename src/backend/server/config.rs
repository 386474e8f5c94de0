/**
 * Server Configuration
 *
 * This module handles loading and validation of server configuration and
 * the selection of the document store.
 *
 * # Configuration Sources
 *
 * Values are read, lowest priority first, from built-in defaults, the TOML
 * file named by `CONVERGEDOC_CONFIG`, and environment variables:
 *
 * - `SERVER_PORT` - Listen port (default 3000)
 * - `DATABASE_URL` - `postgres://...` or `sqlite:...`; unset keeps documents in memory
 * - `FRONTEND_URL` - Allowed CORS origin; unset allows any origin
 * - `DEFAULT_DOCUMENT` - Document served on `/ws` (default `main`)
 * - `SESSION_QUEUE_CAPACITY` - Outgoing messages buffered per session (default 256)
 *
 * The TOML file uses the same keys in lower case.
 *
 * # Error Handling
 *
 * Invalid values are a `ConfigError`. A database that cannot be reached is
 * not: `load_store` logs the failure and falls back to the in-memory store,
 * so the server still starts.
 */

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::backend::collab::state::validate_document_id;
use crate::backend::storage::{DocumentStore, MemoryStore, PostgresStore, SqliteStore, StoreKind};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DOCUMENT: &str = "main";
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 256;

/// Environment variable naming the optional TOML config file
pub const CONFIG_FILE_VAR: &str = "CONVERGEDOC_CONFIG";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub frontend_url: Option<String>,
    pub default_document: String,
    pub session_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            frontend_url: None,
            default_document: DEFAULT_DOCUMENT.to_string(),
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
        }
    }
}

/// Keys accepted in the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_port: Option<u16>,
    database_url: Option<String>,
    frontend_url: Option<String>,
    default_document: Option<String>,
    session_queue_capacity: Option<usize>,
}

impl ServerConfig {
    /// Create a new ServerConfigBuilder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load from the process environment (and the config file it names)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = match lookup(CONFIG_FILE_VAR) {
            Some(path) => ServerConfigBuilder::from_file(path)?,
            None => ServerConfigBuilder::default(),
        };

        if let Some(port) = lookup("SERVER_PORT") {
            builder = builder.port(parse_value("SERVER_PORT", &port)?);
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            builder = builder.database_url(url);
        }
        if let Some(url) = lookup("FRONTEND_URL").filter(|v| !v.is_empty()) {
            builder = builder.frontend_url(url);
        }
        if let Some(doc) = lookup("DEFAULT_DOCUMENT") {
            builder = builder.default_document(doc);
        }
        if let Some(capacity) = lookup("SESSION_QUEUE_CAPACITY") {
            builder = builder.session_queue_capacity(parse_value("SESSION_QUEUE_CAPACITY", &capacity)?);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SESSION_QUEUE_CAPACITY",
                value: "0".to_string(),
            });
        }
        if validate_document_id(&self.default_document).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_DOCUMENT",
                value: self.default_document.clone(),
            });
        }
        if let Some(url) = &self.frontend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        Ok(())
    }

    pub fn store_kind(&self) -> StoreKind {
        StoreKind::from_url(self.database_url.as_deref())
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    port: Option<u16>,
    database_url: Option<String>,
    frontend_url: Option<String>,
    default_document: Option<String>,
    session_queue_capacity: Option<usize>,
}

impl ServerConfigBuilder {
    /// Start from the values in a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Start from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        Ok(Self {
            port: file.server_port,
            database_url: file.database_url,
            frontend_url: file.frontend_url,
            default_document: file.default_document,
            session_queue_capacity: file.session_queue_capacity,
        })
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database URL
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the allowed CORS origin
    pub fn frontend_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = Some(url.into());
        self
    }

    /// Set the document served on `/ws`
    pub fn default_document(mut self, doc_id: impl Into<String>) -> Self {
        self.default_document = Some(doc_id.into());
        self
    }

    /// Set the per-session outgoing queue capacity
    pub fn session_queue_capacity(mut self, capacity: usize) -> Self {
        self.session_queue_capacity = Some(capacity);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let defaults = ServerConfig::default();
        let config = ServerConfig {
            port: self.port.unwrap_or(defaults.port),
            database_url: self.database_url,
            frontend_url: self.frontend_url,
            default_document: self.default_document.unwrap_or(defaults.default_document),
            session_queue_capacity: self
                .session_queue_capacity
                .unwrap_or(defaults.session_queue_capacity),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Open the document store `config` selects
///
/// A database that cannot be reached or migrated is logged and replaced by
/// the in-memory store.
pub async fn load_store(config: &ServerConfig) -> Arc<dyn DocumentStore> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("[Storage] DATABASE_URL not set. Documents will be kept in memory only.");
        return Arc::new(MemoryStore::new());
    };

    let result: Result<Arc<dyn DocumentStore>, _> = match config.store_kind() {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Sqlite => SqliteStore::connect(url)
            .await
            .map(|store| Arc::new(store) as Arc<dyn DocumentStore>),
        StoreKind::Postgres => PostgresStore::connect(url)
            .await
            .map(|store| Arc::new(store) as Arc<dyn DocumentStore>),
    };

    match result {
        Ok(store) => {
            tracing::info!("[Storage] Using {} document store", store.backend_name());
            store
        }
        Err(e) => {
            tracing::error!("[Storage] Failed to open document store: {}", e);
            tracing::warn!("[Storage] Falling back to in-memory documents.");
            Arc::new(MemoryStore::new())
        }
    }
}
