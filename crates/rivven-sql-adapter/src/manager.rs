//! Connection lifecycle: `Unconnected → Connected → Disconnected`
//!
//! A manager owns at most one live session. `Disconnected` is terminal:
//! reconnecting means building a new manager.

use std::sync::Arc;

use crate::connection::{Connection, ConnectionConfig};
use crate::dialect::SqlDialect;
use crate::driver::DriverRegistry;
use crate::error::{Error, Result};
use crate::logger::{LoggedConnection, LoggerRegistry, QueryLogger};
use crate::scheme::{redact_uri, replace_scheme, SchemeDescriptor};
use crate::schema::SchemaProvider;
use crate::type_map::TypeMappingTable;

/// Lifecycle state of a [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// `setup` has not run yet
    Unconnected,
    /// A live session is open
    Connected,
    /// The session was closed; terminal
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Cloneable handle to the live session
#[derive(Clone)]
pub struct ConnectionHandle {
    descriptor: SchemeDescriptor,
    conn: Arc<dyn Connection>,
    dialect: Arc<dyn SqlDialect>,
}

impl ConnectionHandle {
    /// Scheme the session was opened with
    pub fn descriptor(&self) -> &SchemeDescriptor {
        &self.descriptor
    }

    /// Traced connection
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    /// Dialect for statement generation
    pub fn dialect(&self) -> &Arc<dyn SqlDialect> {
        &self.dialect
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("descriptor", &self.descriptor)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

struct LiveSession {
    handle: ConnectionHandle,
    schema: Arc<dyn SchemaProvider>,
    type_mapping: Arc<TypeMappingTable>,
}

/// Owns the single connection of an adapter
pub struct ConnectionManager {
    config: ConnectionConfig,
    drivers: DriverRegistry,
    loggers: Arc<LoggerRegistry>,
    state: ConnectionState,
    live: Option<LiveSession>,
}

impl ConnectionManager {
    /// Create a manager using the bundled drivers
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_drivers(config, DriverRegistry::default())
    }

    /// Create a manager using a custom driver registry
    pub fn with_drivers(config: ConnectionConfig, drivers: DriverRegistry) -> Self {
        Self {
            config,
            drivers,
            loggers: Arc::new(LoggerRegistry::new()),
            state: ConnectionState::Unconnected,
            live: None,
        }
    }

    /// Open the connection
    ///
    /// Normalizes the URI scheme, selects the driver, rewrites the URI with
    /// the normalized scheme and connects. Only valid from `Unconnected`.
    pub async fn setup(&mut self) -> Result<ConnectionHandle> {
        match self.state {
            ConnectionState::Unconnected => {}
            ConnectionState::Connected => {
                return Err(Error::invalid_state("setup called on a connected adapter"))
            }
            ConnectionState::Disconnected => {
                return Err(Error::invalid_state(
                    "setup called after disconnect; create a new adapter to reconnect",
                ))
            }
        }

        let descriptor =
            SchemeDescriptor::from_uri(&self.config.url, self.config.alternate_connectivity)?;
        let factory = self.drivers.factory(descriptor.backend)?;

        let url = replace_scheme(&self.config.url, &descriptor.scheme);
        let raw = factory.connect(&self.config.with_url(url.as_str())).await?;

        let conn: Arc<dyn Connection> =
            Arc::new(LoggedConnection::new(raw, Arc::clone(&self.loggers)));
        let schema: Arc<dyn SchemaProvider> = Arc::from(factory.schema_provider(Arc::clone(&conn)));

        tracing::info!(
            backend = %descriptor.backend,
            scheme = %descriptor.scheme,
            url = %redact_uri(&url),
            "Connected"
        );

        let handle = ConnectionHandle {
            descriptor,
            conn,
            dialect: factory.dialect(),
        };
        self.live = Some(LiveSession {
            handle: handle.clone(),
            schema,
            type_mapping: factory.type_mapping(),
        });
        self.state = ConnectionState::Connected;
        Ok(handle)
    }

    /// Close the connection
    ///
    /// The manager is `Disconnected` afterwards even if the driver reports
    /// a close failure.
    pub async fn disconnect(&mut self) -> Result<()> {
        let live = self.live.take().ok_or(Error::not_connected("disconnect"))?;
        self.state = ConnectionState::Disconnected;

        let result = live.handle.conn.close().await;
        self.loggers.clear();
        match &result {
            Ok(()) => tracing::info!(backend = %live.handle.descriptor.backend, "Disconnected"),
            Err(e) => tracing::warn!(
                backend = %live.handle.descriptor.backend,
                category = e.category().as_str(),
                error = %e,
                "Error while closing connection"
            ),
        }
        result
    }

    /// Attach a trace sink to the live connection
    ///
    /// Sinks accumulate; attaching the same logger twice delivers every
    /// entry to it twice. The connection keeps each sink alive until
    /// `disconnect`.
    pub fn attach_logger(&self, logger: &Arc<dyn QueryLogger>) -> Result<()> {
        if self.live.is_none() {
            return Err(Error::not_connected("attach_logger"));
        }
        self.loggers.attach(logger);
        tracing::debug!(sinks = self.loggers.len(), "Logger attached");
        Ok(())
    }

    /// Live handle, or `NotConnected` naming the calling operation
    pub fn handle(&self, operation: &'static str) -> Result<&ConnectionHandle> {
        self.live
            .as_ref()
            .map(|live| &live.handle)
            .ok_or(Error::not_connected(operation))
    }

    /// Schema provider of the live session
    pub fn schema_provider(&self, operation: &'static str) -> Result<Arc<dyn SchemaProvider>> {
        self.live
            .as_ref()
            .map(|live| Arc::clone(&live.schema))
            .ok_or(Error::not_connected(operation))
    }

    /// Type mapping table of the live session's backend
    pub fn type_mapping(&self, operation: &'static str) -> Result<Arc<TypeMappingTable>> {
        self.live
            .as_ref()
            .map(|live| Arc::clone(&live.type_mapping))
            .ok_or(Error::not_connected(operation))
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a live session is open
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Connection configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Driver registry used by `setup`
    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("loggers", &self.loggers)
            .finish()
    }
}
