//! Sessions and the factories that open them.
//!
//! A [`Connection`] is one live database session. A [`ConnectionFactory`]
//! knows how to open sessions for a single [`Backend`] and which catalog,
//! type table and dialect go with them. [`ConnectionConfig`] carries the URI
//! plus opaque driver options.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::dialect::{dialect_for, SqlDialect};
use crate::error::Result;
use crate::scheme::Backend;
use crate::schema::SchemaProvider;
use crate::type_map::TypeMappingTable;
use crate::types::{Row, Value};

/// One live database session
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a row-returning statement with positional parameters
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement and report how many rows it touched
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// First row of [`query`](Self::query), if any
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    /// Round-trip to the server; false once closed or broken
    async fn is_valid(&self) -> bool;

    /// Release the session
    ///
    /// Statements issued afterwards fail with `Error::NotConnected`.
    async fn close(&self) -> Result<()>;

    /// Backend this session talks to
    fn backend(&self) -> Backend;
}

/// Everything a factory needs to open a session
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Database URI as given by the caller (`sqlite3:app.db`, `mysql2://...`)
    pub url: String,
    /// Upper bound on opening a session, in milliseconds
    pub connect_timeout_ms: u64,
    /// Reported to servers that track client names
    pub application_name: Option<String>,
    /// Driver options, passed through untouched
    pub options: HashMap<String, String>,
    /// Route non-postgres schemes through the `jdbc:` family
    pub alternate_connectivity: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // password stays out of logs
        let ConnectionConfig {
            url,
            connect_timeout_ms,
            application_name,
            options,
            alternate_connectivity,
        } = self;
        f.debug_struct("ConnectionConfig")
            .field("url", &crate::scheme::redact_uri(url))
            .field("connect_timeout_ms", connect_timeout_ms)
            .field("application_name", application_name)
            .field("options", options)
            .field("alternate_connectivity", alternate_connectivity)
            .finish()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout_ms: 10_000,
            application_name: Some("rivven-sql-adapter".into()),
            options: HashMap::new(),
            alternate_connectivity: false,
        }
    }
}

impl ConnectionConfig {
    /// Defaults for everything but the URI
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Override the connect timeout
    pub fn with_connect_timeout(self, connect_timeout_ms: u64) -> Self {
        Self {
            connect_timeout_ms,
            ..self
        }
    }

    /// Override the reported client name
    pub fn with_application_name(self, name: impl Into<String>) -> Self {
        Self {
            application_name: Some(name.into()),
            ..self
        }
    }

    /// The connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Add a driver option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Replace all driver options
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable alternate connectivity routing
    pub fn with_alternate_connectivity(mut self, enabled: bool) -> Self {
        self.alternate_connectivity = enabled;
        self
    }

    /// Look up a driver option
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Copy of this configuration pointing at a different URL
    pub(crate) fn with_url(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..self.clone()
        }
    }
}

/// Opens sessions for one backend kind
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a fresh session
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;

    /// Backend served by this factory
    fn backend(&self) -> Backend;

    /// Schema metadata source bound to a live connection
    fn schema_provider(&self, conn: Arc<dyn Connection>) -> Box<dyn SchemaProvider>;

    /// Native type token table for this backend
    fn type_mapping(&self) -> Arc<TypeMappingTable>;

    /// SQL dialect used to build dataset statements
    fn dialect(&self) -> Arc<dyn SqlDialect> {
        dialect_for(self.backend())
    }
}
