//! Declarative adapter configuration
//!
//! ```rust
//! use rivven_sql_adapter::config::AdapterConfig;
//!
//! let config = AdapterConfig::from_json(r#"{
//!     "uri": "sqlite3::memory:",
//!     "options": { "foreign_keys": "true" }
//! }"#).unwrap();
//! assert_eq!(config.connect_timeout_ms, 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::connection::ConnectionConfig;
use crate::error::{Error, Result};
use crate::scheme::{is_supported_scheme, redact_uri, scheme_of};

/// Serializable adapter configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Connection URI, `scheme:rest`
    pub uri: String,

    /// Driver options, passed through untouched
    #[serde(default)]
    pub options: HashMap<String, String>,

    /// Route non-postgres schemes through the `jdbc:` family
    #[serde(default)]
    pub alternate_connectivity: bool,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Application name reported to the server, where supported
    #[serde(default)]
    pub application_name: Option<String>,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl AdapterConfig {
    /// Configuration for a URI with default settings
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            options: HashMap::new(),
            alternate_connectivity: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            application_name: None,
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid adapter configuration: {}", e)))
    }

    /// Check the URI names a supported scheme and the timeout is usable
    pub fn validate(&self) -> Result<()> {
        let scheme = scheme_of(&self.uri)?;
        if !is_supported_scheme(scheme) {
            return Err(Error::unsupported_scheme(scheme));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::config("connect_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Convert into the driver-level configuration
    pub fn into_connection_config(self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.uri)
            .with_connect_timeout(self.connect_timeout_ms)
            .with_options(self.options)
            .with_alternate_connectivity(self.alternate_connectivity);
        if let Some(name) = self.application_name {
            config = config.with_application_name(name);
        }
        config
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("options", &self.options)
            .field("alternate_connectivity", &self.alternate_connectivity)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl From<AdapterConfig> for ConnectionConfig {
    fn from(config: AdapterConfig) -> Self {
        config.into_connection_config()
    }
}
