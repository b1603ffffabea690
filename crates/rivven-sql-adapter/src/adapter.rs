//! Adapter facade: the surface a relation-mapping layer talks to
//!
//! `SqlAdapter` composes the connection manager, schema introspector and
//! dataset accessor behind the [`Adapter`] contract.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use crate::config::AdapterConfig;
use crate::connection::ConnectionConfig;
use crate::dataset::{DatasetAccessor, DatasetHandle};
use crate::driver::DriverRegistry;
use crate::error::Result;
use crate::introspect::SchemaIntrospector;
use crate::logger::QueryLogger;
use crate::manager::{ConnectionHandle, ConnectionManager, ConnectionState};
use crate::relation::{CommandNamespace, Relation, RelationClass, RelationInclusion};
use crate::scheme::{SchemeDescriptor, SUPPORTED_SCHEMES};
use crate::types::ColumnDescriptor;

/// Contract between an adapter and the relation-mapping layer
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Schemes this adapter accepts, before normalization
    fn schemes() -> &'static [&'static str]
    where
        Self: Sized;

    /// Open the connection
    async fn setup(&mut self) -> Result<()>;

    /// Close the connection; a second call fails with `NotConnected`
    async fn disconnect(&mut self) -> Result<()>;

    /// Names of all tables, queried live
    async fn schema(&self) -> Result<BTreeSet<String>>;

    /// Dataset for a table, without an existence check
    fn dataset(&self, table: &str) -> Result<DatasetHandle>;

    /// Index-style access to a dataset
    fn get(&self, table: &str) -> Result<DatasetHandle> {
        self.dataset(table)
    }

    /// Whether a table exists
    async fn has_dataset(&self, table: &str) -> Result<bool>;

    /// Attach a logger to the connection and remember it
    ///
    /// The connection holds the logger until `disconnect`, so a temporary
    /// may be passed.
    fn set_logger(&mut self, logger: &Arc<dyn QueryLogger>) -> Result<()>;

    /// Most recently set logger, while the connection or the caller holds it
    fn logger(&self) -> Option<Arc<dyn QueryLogger>>;

    /// Install the SQL capability on a relation class
    fn extend_relation_class(&self, class: &mut dyn RelationClass);

    /// Bind a relation's model to the relation's dataset, returning raw rows
    fn extend_relation_instance(&self, relation: &mut dyn Relation);

    /// Namespace write commands are dispatched to
    fn command_namespace(&self) -> CommandNamespace;
}

/// SQL database adapter
pub struct SqlAdapter {
    manager: ConnectionManager,
    logger: Option<Weak<dyn QueryLogger>>,
}

impl SqlAdapter {
    /// Adapter for a connection URI with default settings
    pub fn new(uri: impl Into<String>) -> Self {
        Self::from_connection_config(ConnectionConfig::new(uri))
    }

    /// Adapter from declarative configuration
    pub fn from_config(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_connection_config(config.into_connection_config()))
    }

    /// Adapter from a driver-level configuration
    pub fn from_connection_config(config: ConnectionConfig) -> Self {
        Self {
            manager: ConnectionManager::new(config),
            logger: None,
        }
    }

    /// Adapter with a custom driver registry
    pub fn with_drivers(config: ConnectionConfig, drivers: DriverRegistry) -> Self {
        Self {
            manager: ConnectionManager::with_drivers(config, drivers),
            logger: None,
        }
    }

    /// Connection URI as configured
    pub fn uri(&self) -> &str {
        &self.manager.config().url
    }

    /// Scheme of the live session
    pub fn descriptor(&self) -> Option<&SchemeDescriptor> {
        self.manager.handle("descriptor").ok().map(|h| h.descriptor())
    }

    /// Live connection handle
    pub fn connection(&self) -> Result<&ConnectionHandle> {
        self.manager.handle("connection")
    }

    /// Lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Schema introspection over the live session
    pub fn introspector(&self) -> SchemaIntrospector<'_> {
        SchemaIntrospector::new(&self.manager)
    }

    /// Dataset access over the live session
    pub fn datasets(&self) -> DatasetAccessor<'_> {
        DatasetAccessor::new(&self.manager)
    }

    /// Column names of a table in declaration order
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        self.introspector().list_columns(table).await
    }

    /// Canonical attribute types of a table
    pub async fn attributes(&self, table: &str) -> Result<IndexMap<String, ColumnDescriptor>> {
        self.introspector().describe_attributes(table).await
    }
}

#[async_trait]
impl Adapter for SqlAdapter {
    fn schemes() -> &'static [&'static str] {
        SUPPORTED_SCHEMES
    }

    async fn setup(&mut self) -> Result<()> {
        self.manager.setup().await.map(|_| ())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.manager.disconnect().await
    }

    async fn schema(&self) -> Result<BTreeSet<String>> {
        self.introspector().list_tables().await
    }

    fn dataset(&self, table: &str) -> Result<DatasetHandle> {
        self.datasets().dataset(table)
    }

    async fn has_dataset(&self, table: &str) -> Result<bool> {
        self.datasets().dataset_exists(table).await
    }

    fn set_logger(&mut self, logger: &Arc<dyn QueryLogger>) -> Result<()> {
        self.manager.attach_logger(logger)?;
        self.logger = Some(Arc::downgrade(logger));
        Ok(())
    }

    fn logger(&self) -> Option<Arc<dyn QueryLogger>> {
        self.logger.as_ref().and_then(Weak::upgrade)
    }

    fn extend_relation_class(&self, class: &mut dyn RelationClass) {
        tracing::debug!(class = class.name(), "Installing SQL relation capability");
        class.include(RelationInclusion::sql());
    }

    fn extend_relation_instance(&self, relation: &mut dyn Relation) {
        let dataset = relation.dataset().naked();
        relation.model_mut().set_dataset(dataset);
    }

    fn command_namespace(&self) -> CommandNamespace {
        CommandNamespace::Sql
    }
}

impl std::fmt::Debug for SqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlAdapter")
            .field("manager", &self.manager)
            .field("has_logger", &self.logger().is_some())
            .finish()
    }
}
