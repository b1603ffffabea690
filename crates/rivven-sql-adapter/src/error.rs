//! Error types for rivven-sql-adapter
//!
//! Every adapter error carries the context needed to diagnose it without
//! re-running with elevated logging: the scheme, the table name, or the
//! backend type token that failed.
//!
//! Classification mirrors the connectivity layer:
//! - Retriable errors (connection failures)
//! - Fatal errors (unmapped types, unsupported schemes, state violations)

use std::fmt;
use thiserror::Error;

use crate::scheme::Backend;

/// Result type for rivven-sql-adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-related errors (network, auth, file access)
    Connection,
    /// Scheme resolution and driver selection
    Scheme,
    /// Lifecycle violations (not connected, already disconnected)
    State,
    /// Schema lookups (table not found)
    Schema,
    /// Backend type token without a canonical mapping
    TypeMapping,
    /// Statement execution errors
    Query,
    /// Value conversion errors
    TypeConversion,
    /// Configuration error
    Configuration,
    /// Unknown/other errors
    Other,
}

impl ErrorCategory {
    /// Only connection failures are worth another attempt.
    ///
    /// The adapter never retries on its own.
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection)
    }

    /// Stable snake_case label, used as a tracing field
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Scheme => "scheme",
            Self::State => "state",
            Self::Schema => "schema",
            Self::TypeMapping => "type_mapping",
            Self::Query => "query",
            Self::TypeConversion => "type_conversion",
            Self::Configuration => "configuration",
            Self::Other => "other",
        }
    }
}

/// Main error type for rivven-sql-adapter
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Scheme (post-normalization) is not one of the known backends
    #[error("unsupported scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Backend is known but no driver is compiled in or registered for it
    #[error("driver not available for backend: {backend} (not compiled or registered)")]
    DriverNotAvailable { backend: Backend },

    /// Connection failed (network, authentication, file access)
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation requires a live connection handle
    #[error("not connected: {operation} requires an active connection")]
    NotConnected { operation: &'static str },

    /// Lifecycle transition that the state machine forbids
    #[error("invalid connection state: {message}")]
    InvalidState { message: String },

    /// Table is not present in the connected database
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// Backend type token has no canonical mapping
    #[error("unmapped type: {backend} type '{type_token}' for column {table}.{column}")]
    UnmappedType {
        backend: Backend,
        table: String,
        column: String,
        type_token: String,
    },

    /// Statement execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Value conversion failed
    #[error("type conversion error: {message}")]
    TypeConversion { message: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Which [`ErrorCategory`] this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::UnsupportedScheme { .. } | Self::DriverNotAvailable { .. } => {
                ErrorCategory::Scheme
            }
            Self::NotConnected { .. } | Self::InvalidState { .. } => ErrorCategory::State,
            Self::TableNotFound { .. } => ErrorCategory::Schema,
            Self::UnmappedType { .. } => ErrorCategory::TypeMapping,
            Self::Query { .. } => ErrorCategory::Query,
            Self::TypeConversion { .. } => ErrorCategory::TypeConversion,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Other,
        }
    }

    /// Shorthand for `self.category().is_retriable()`
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create an unsupported scheme error
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-connected error for the named operation
    pub fn not_connected(operation: &'static str) -> Self {
        Self::NotConnected { operation }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a table not found error
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a type conversion error
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// SQL text attached to a query error, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
