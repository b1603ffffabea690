//! # rivven-sql-adapter
//!
//! SQL database adapter for a relation-mapping layer.
//!
//! The adapter takes a connection URI, normalizes its scheme, opens a
//! connection through the matching driver, and exposes the database as a
//! set of named datasets with canonical attribute types.
//!
//! ## Features
//!
//! - **Scheme Normalization**: 23 accepted scheme aliases (`sqlite3`,
//!   `postgresql`, `mysql2`, ...) resolved to canonical backends
//! - **Connection Lifecycle**: explicit `Unconnected -> Connected -> Disconnected`
//!   state machine with query logging
//! - **Schema Introspection**: live table listing and native-to-canonical
//!   column type mapping
//! - **Dataset Access**: table handles for reads, counts, inserts and deletes
//! - **SQL Dialect Abstraction**: vendor-agnostic SQL generation using sea-query
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivven_sql_adapter::prelude::*;
//!
//! let mut adapter = SqlAdapter::new("sqlite3::memory:");
//! adapter.setup().await?;
//!
//! let tables = adapter.schema().await?;
//! let users = adapter.dataset("users")?;
//! let rows = users.all().await?;
//!
//! for (name, column) in adapter.attributes("users").await? {
//!     println!("{name}: {}", column.canonical_type);
//! }
//!
//! adapter.disconnect().await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `sqlite` - SQLite support via rusqlite (default)
//! - `postgres` - PostgreSQL support via tokio-postgres
//! - `mysql` - MySQL/MariaDB support via mysql_async
//! - `full` - All drivers enabled

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod connection;
pub mod dataset;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod logger;
pub mod manager;
pub mod relation;
pub mod schema;
pub mod scheme;
pub mod security;
pub mod type_map;
pub mod types;

// Driver implementations (conditionally compiled)
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{
        CanonicalType, ColumnDescriptor, ColumnMetadata, Row, TableMetadata, Value,
    };

    // Scheme handling
    pub use crate::scheme::{
        is_database_file, normalize_scheme, Backend, SchemeDescriptor, SUPPORTED_SCHEMES,
    };

    // Connection traits and config
    pub use crate::config::AdapterConfig;
    pub use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
    pub use crate::driver::DriverRegistry;
    pub use crate::manager::{ConnectionHandle, ConnectionManager, ConnectionState};

    // Dialect and schema types
    pub use crate::dialect::{dialect_for, SqlDialect};
    pub use crate::introspect::SchemaIntrospector;
    pub use crate::schema::SchemaProvider;
    pub use crate::type_map::TypeMappingTable;

    // Datasets and logging
    pub use crate::dataset::{DatasetAccessor, DatasetHandle};
    pub use crate::logger::{LogEntry, LogLevel, MemoryLogger, QueryLogger, TracingLogger};

    // Adapter facade
    pub use crate::adapter::{Adapter, SqlAdapter};
    pub use crate::relation::{
        CommandNamespace, DatasetRelation, Relation, RelationClass, RelationClassDef,
        RelationInclusion, RelationModel,
    };
}

// Re-export commonly used items at crate root
pub use adapter::{Adapter, SqlAdapter};
pub use error::{Error, Result};
pub use types::Value;
