//! Configuration management.
//!
//! Connection parameters can be built directly or loaded from a TOML file
//! with environment overrides:
//!
//! ```toml
//! [connection]
//! mode = "cloud"
//! url = "https://xyz.cloud.qdrant.io:6333"
//! api_key = "..."
//!
//! [connector]
//! search_layout = "per_hit"
//!
//! [[indexes]]
//! name = "docs"
//! size = 384
//! distance = "cosine"
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `VECBRIDGE_MODE` | `connection.mode` |
//! | `VECBRIDGE_URL` | `connection.url` |
//! | `VECBRIDGE_API_KEY` | `connection.api_key` |
//! | `VECBRIDGE_SEARCH_LAYOUT` | `connector.search_layout` |

use crate::connector::{ConnectorOptions, SearchResultLayout};
use crate::models::IndexConfig;
use crate::storage::MEMORY_TARGET;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

/// Connection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnType {
    /// In-process, non-persisted.
    #[default]
    Memory,
    /// Local server URL or snapshot path.
    Local,
    /// Remote (hosted) server URL.
    Cloud,
}

impl ConnType {
    /// Parses a mode string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Some(Self::Memory),
            "local" => Some(Self::Local),
            "cloud" | "remote" => Some(Self::Cloud),
            _ => None,
        }
    }

    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

/// Resolved connection parameters.
///
/// In-memory mode always targets the reserved `:memory:` sentinel; local and
/// cloud modes pass the URL through unchanged.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    conn_type: ConnType,
    url: String,
    api_key: Option<SecretString>,
}

impl ConnectionParams {
    /// Creates connection parameters.
    #[must_use]
    pub fn new(conn_type: ConnType, url: impl Into<String>) -> Self {
        let url = match conn_type {
            ConnType::Memory => MEMORY_TARGET.to_string(),
            ConnType::Local | ConnType::Cloud => url.into(),
        };
        Self {
            conn_type,
            url,
            api_key: None,
        }
    }

    /// Creates in-memory connection parameters.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(ConnType::Memory, "")
    }

    /// Sets the API key for remote servers.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Returns the connection mode.
    #[must_use]
    pub const fn conn_type(&self) -> ConnType {
        self.conn_type
    }

    /// Returns the connection target.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the API key, if set.
    #[must_use]
    pub const fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::memory()
    }
}

/// Full configuration for a connector.
#[derive(Debug, Clone, Default)]
pub struct VecbridgeConfig {
    /// Connection parameters.
    pub connection: ConnectionParams,
    /// Connector behaviour options.
    pub connector: ConnectorOptions,
    /// Index configurations registered at construction.
    pub indexes: Vec<IndexConfig>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    /// Connection section.
    connection: Option<ConfigFileConnection>,
    /// Connector section.
    connector: Option<ConfigFileConnector>,
    /// Index configurations.
    #[serde(default)]
    indexes: Vec<IndexConfig>,
}

/// Connection section in config file.
#[derive(Debug, Deserialize, Default)]
struct ConfigFileConnection {
    /// Connection mode.
    mode: Option<String>,
    /// Server URL or snapshot path.
    url: Option<String>,
    /// API key.
    api_key: Option<String>,
}

/// Connector section in config file.
#[derive(Debug, Deserialize, Default)]
struct ConfigFileConnector {
    /// Search result layout: `per_hit` or `merged`.
    search_layout: Option<String>,
    /// Whether upserts wait for completion.
    wait_for_upsert: Option<bool>,
}

impl VecbridgeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or holds unknown values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("invalid config file: {e}")))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `vecbridge/config.toml` in the platform config dir, then
    /// applies environment overrides. Returns defaults (in-memory) if no
    /// file is found or the file is unusable.
    #[must_use]
    pub fn load_default() -> Self {
        let mut config = directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("vecbridge").join("config.toml"))
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                    None
                },
            })
            .unwrap_or_default();

        if let Err(e) = config.apply_env_overrides() {
            tracing::warn!(error = %e, "ignoring invalid environment override");
        }
        config
    }

    /// Applies `VECBRIDGE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override holds an unknown value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let mode = lookup("VECBRIDGE_MODE");
        let url = lookup("VECBRIDGE_URL");
        if mode.is_some() || url.is_some() {
            let conn_type = match mode {
                Some(mode) => parse_mode(&mode)?,
                None if self.connection.conn_type() == ConnType::Memory => ConnType::Local,
                None => self.connection.conn_type(),
            };
            let url = url.unwrap_or_else(|| self.connection.url().to_string());
            let api_key = self.connection.api_key.take();
            self.connection = ConnectionParams::new(conn_type, url);
            self.connection.api_key = api_key;
        }

        if let Some(key) = lookup("VECBRIDGE_API_KEY") {
            self.connection.api_key = Some(SecretString::from(key));
        }
        if let Some(layout) = lookup("VECBRIDGE_SEARCH_LAYOUT") {
            self.connector.search_layout = parse_layout(&layout)?;
        }
        Ok(())
    }

    /// Converts a `ConfigFile` to `VecbridgeConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(connection) = file.connection {
            let conn_type = match connection.mode {
                Some(mode) => parse_mode(&mode)?,
                None if connection.url.is_some() => ConnType::Local,
                None => ConnType::Memory,
            };
            config.connection =
                ConnectionParams::new(conn_type, connection.url.unwrap_or_default());
            config.connection.api_key = connection.api_key.map(SecretString::from);
        }
        if let Some(connector) = file.connector {
            if let Some(layout) = connector.search_layout {
                config.connector.search_layout = parse_layout(&layout)?;
            }
            if let Some(wait) = connector.wait_for_upsert {
                config.connector.wait_for_upsert = wait;
            }
        }
        config.indexes = file.indexes;

        Ok(config)
    }

    /// Sets the connection parameters.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }

    /// Adds an index configuration.
    #[must_use]
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.indexes.push(index);
        self
    }
}

fn parse_mode(mode: &str) -> Result<ConnType> {
    ConnType::parse(mode)
        .ok_or_else(|| Error::Configuration(format!("unknown connection mode '{mode}'")))
}

fn parse_layout(layout: &str) -> Result<SearchResultLayout> {
    SearchResultLayout::parse(layout)
        .ok_or_else(|| Error::Configuration(format!("unknown search layout '{layout}'")))
}
