//! Schema discovery for rivven-sql-adapter
//!
//! `SchemaProvider` is the read-only metadata source each driver supplies.
//! Results reflect the database at call time; nothing is cached.
//!
//! `CatalogSchemaProvider` serves every bundled backend by running the
//! dialect's catalog queries over the live connection.

use async_trait::async_trait;
use std::sync::Arc;

use crate::connection::Connection;
use crate::dialect::SqlDialect;
use crate::error::{Error, Result};
use crate::types::{ColumnMetadata, Row, TableMetadata, Value};

/// Schema provider for read-only schema discovery
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// List all user tables visible to the connection
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Get table metadata, `None` when the table does not exist
    async fn get_table(&self, table: &str) -> Result<Option<TableMetadata>>;

    /// Check if a table exists
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.list_tables().await?.iter().any(|t| t == table))
    }

    /// Get all columns for a table, in declaration order
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        let meta = self.get_table(table).await?;
        Ok(meta.map(|t| t.columns).unwrap_or_default())
    }

    /// Get column by name
    async fn get_column(&self, table: &str, column: &str) -> Result<Option<ColumnMetadata>> {
        let meta = self.get_table(table).await?;
        Ok(meta.and_then(|t| t.column(column).cloned()))
    }
}

/// Schema provider backed by the dialect's catalog queries
pub struct CatalogSchemaProvider {
    conn: Arc<dyn Connection>,
    dialect: Arc<dyn SqlDialect>,
}

impl CatalogSchemaProvider {
    /// Create a provider over a live connection
    pub fn new(conn: Arc<dyn Connection>, dialect: Arc<dyn SqlDialect>) -> Self {
        Self { conn, dialect }
    }
}

#[async_trait]
impl SchemaProvider for CatalogSchemaProvider {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self.conn.query(&self.dialect.list_tables_sql(), &[]).await?;
        rows.iter().map(|row| text_at(row, 0)).collect()
    }

    async fn get_table(&self, table: &str) -> Result<Option<TableMetadata>> {
        let rows = self
            .conn
            .query(&self.dialect.list_columns_sql(), &[Value::from(table)])
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut meta = TableMetadata::new(table);
        for row in &rows {
            meta.columns.push(column_from_row(row)?);
        }
        Ok(Some(meta))
    }
}

fn text_at(row: &Row, idx: usize) -> Result<String> {
    row.get(idx).and_then(Value::as_string).ok_or_else(|| {
        Error::type_conversion(format!("catalog row has no text at column {}", idx))
    })
}

fn column_from_row(row: &Row) -> Result<ColumnMetadata> {
    let mut column = ColumnMetadata::new(text_at(row, 0)?, text_at(row, 1)?);
    column.nullable = row.get(2).and_then(Value::as_bool).unwrap_or(true);
    column.ordinal = row
        .get(3)
        .and_then(Value::as_i64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    column.default_value = row.get(4).and_then(Value::as_string);
    // SQLite reports 0 for non-key columns
    column.primary_key_ordinal = row
        .get(5)
        .and_then(Value::as_i64)
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok());
    Ok(column)
}
