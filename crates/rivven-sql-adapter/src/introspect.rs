//! Live schema introspection
//!
//! Every call goes to the database; the adapter never caches table or
//! column lists, so DDL run elsewhere is visible immediately.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::manager::ConnectionManager;
use crate::types::{ColumnDescriptor, TableMetadata};

/// Table, column and attribute discovery over a manager's live session
#[derive(Debug, Clone, Copy)]
pub struct SchemaIntrospector<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> SchemaIntrospector<'a> {
    /// Introspector bound to a manager
    pub fn new(manager: &'a ConnectionManager) -> Self {
        Self { manager }
    }

    /// Names of all user tables
    pub async fn list_tables(&self) -> Result<BTreeSet<String>> {
        let schema = self.manager.schema_provider("list_tables")?;
        Ok(schema.list_tables().await?.into_iter().collect())
    }

    /// Column names of a table in declaration order
    pub async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let meta = self.table_metadata("list_columns", table).await?;
        Ok(meta.columns.into_iter().map(|c| c.name).collect())
    }

    /// Canonical attribute description of a table, keyed by column name
    ///
    /// Fails with `UnmappedType` on the first column whose native type has
    /// no canonical counterpart.
    pub async fn describe_attributes(
        &self,
        table: &str,
    ) -> Result<IndexMap<String, ColumnDescriptor>> {
        let mapping = self.manager.type_mapping("describe_attributes")?;
        let meta = self.table_metadata("describe_attributes", table).await?;

        let mut attributes = IndexMap::with_capacity(meta.columns.len());
        for column in meta.columns {
            let canonical = mapping.resolve(table, &column.name, &column.type_name)?;
            attributes.insert(
                column.name.clone(),
                ColumnDescriptor::new(column.name, canonical),
            );
        }
        Ok(attributes)
    }

    async fn table_metadata(&self, operation: &'static str, table: &str) -> Result<TableMetadata> {
        let schema = self.manager.schema_provider(operation)?;
        if !schema.list_tables().await?.iter().any(|t| t == table) {
            return Err(Error::table_not_found(table));
        }
        schema
            .get_table(table)
            .await?
            .ok_or_else(|| Error::table_not_found(table))
    }
}
