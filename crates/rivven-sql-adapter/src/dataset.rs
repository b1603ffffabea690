//! Table-level data access handed to the relation-mapping layer
//!
//! `DatasetAccessor::dataset` does not check that the table exists; a handle
//! for a missing table fails on first use with the backend's query error.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::introspect::SchemaIntrospector;
use crate::manager::{ConnectionHandle, ConnectionManager};
use crate::schema::SchemaProvider;
use crate::types::{Row, Value};

/// Post-processing applied to every row a dataset returns
pub type RowMapper = Arc<dyn Fn(Row) -> Row + Send + Sync>;

/// Queryable handle for one table
#[derive(Clone)]
pub struct DatasetHandle {
    table: String,
    handle: ConnectionHandle,
    schema: Arc<dyn SchemaProvider>,
    row_mapper: Option<RowMapper>,
}

impl DatasetHandle {
    /// Table this dataset reads
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Connection the dataset runs on
    pub fn connection_handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Column names in declaration order
    pub async fn columns(&self) -> Result<Vec<String>> {
        let meta = self
            .schema
            .get_table(&self.table)
            .await?
            .ok_or_else(|| Error::table_not_found(&self.table))?;
        Ok(meta.columns.into_iter().map(|c| c.name).collect())
    }

    /// Every row of the table
    pub async fn all(&self) -> Result<Vec<Row>> {
        let sql = self.handle.dialect().build_select(&self.table, &[], None);
        let rows = self.handle.connection().query(&sql, &[]).await?;
        Ok(rows.into_iter().map(|row| self.map_row(row)).collect())
    }

    /// The first row, if any
    pub async fn first(&self) -> Result<Option<Row>> {
        let sql = self.handle.dialect().build_select(&self.table, &[], Some(1));
        let row = self.handle.connection().query_one(&sql, &[]).await?;
        Ok(row.map(|row| self.map_row(row)))
    }

    /// Number of rows
    pub async fn count(&self) -> Result<u64> {
        let sql = self.handle.dialect().build_count(&self.table);
        let row = self
            .handle
            .connection()
            .query_one(&sql, &[])
            .await?
            .ok_or_else(|| Error::query_with_sql("count returned no rows", &sql))?;
        row.get(0)
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| Error::type_conversion(format!("invalid count for {}", self.table)))
    }

    /// Insert one row, returning the affected row count
    pub async fn insert(&self, values: &[(&str, Value)]) -> Result<u64> {
        let columns: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
        let params: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        let sql = self.handle.dialect().build_insert(&self.table, &columns)?;
        self.handle.connection().execute(&sql, &params).await
    }

    /// Delete every row, returning the affected row count
    pub async fn delete(&self) -> Result<u64> {
        let sql = self.handle.dialect().build_delete(&self.table);
        self.handle.connection().execute(&sql, &[]).await
    }

    /// Copy of this dataset that passes every returned row through `mapper`
    pub fn with_row_mapper(&self, mapper: impl Fn(Row) -> Row + Send + Sync + 'static) -> Self {
        Self {
            row_mapper: Some(Arc::new(mapper)),
            ..self.clone()
        }
    }

    /// Copy of this dataset returning raw rows
    pub fn naked(&self) -> Self {
        Self {
            row_mapper: None,
            ..self.clone()
        }
    }

    /// Whether rows are returned unprocessed
    pub fn is_naked(&self) -> bool {
        self.row_mapper.is_none()
    }

    fn map_row(&self, row: Row) -> Row {
        match &self.row_mapper {
            Some(mapper) => mapper(row),
            None => row,
        }
    }
}

impl std::fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("table", &self.table)
            .field("backend", &self.handle.descriptor().backend)
            .field("naked", &self.is_naked())
            .finish()
    }
}

/// Hands out dataset handles for a manager's live session
#[derive(Debug, Clone, Copy)]
pub struct DatasetAccessor<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> DatasetAccessor<'a> {
    /// Accessor bound to a manager
    pub fn new(manager: &'a ConnectionManager) -> Self {
        Self { manager }
    }

    /// Dataset handle for a table, without checking that it exists
    pub fn dataset(&self, table: &str) -> Result<DatasetHandle> {
        let handle = self.manager.handle("dataset")?.clone();
        let schema = self.manager.schema_provider("dataset")?;
        Ok(DatasetHandle {
            table: table.to_string(),
            handle,
            schema,
            row_mapper: None,
        })
    }

    /// Whether the table currently exists
    pub async fn dataset_exists(&self, table: &str) -> Result<bool> {
        self.manager.handle("dataset_exists")?;
        let tables = SchemaIntrospector::new(self.manager).list_tables().await?;
        Ok(tables.contains(table))
    }
}
