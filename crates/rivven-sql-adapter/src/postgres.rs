//! PostgreSQL driver for rivven-sql-adapter
//!
//! Backed by `tokio-postgres`. The connection task runs on the tokio
//! runtime and is stopped by dropping the client on `close`.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::types::{ToSql, Type};

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::error::{Error, Result};
use crate::scheme::{redact_uri, Backend};
use crate::schema::{CatalogSchemaProvider, SchemaProvider};
use crate::type_map::TypeMappingTable;
use crate::types::{Row, Value};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Convert a driver-neutral value to a tokio-postgres parameter
fn value_to_sql(value: &Value) -> BoxedParam {
    match value {
        Value::Null => Box::new(Option::<i32>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int16(n) => Box::new(*n),
        Value::Int32(n) => Box::new(*n),
        Value::Int64(n) => Box::new(*n),
        Value::Float32(n) => Box::new(*n),
        Value::Float64(n) => Box::new(*n),
        Value::Decimal(d) => Box::new(*d),
        Value::String(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Date(d) => Box::new(*d),
        Value::Time(t) => Box::new(*t),
        Value::DateTime(dt) => Box::new(*dt),
        Value::DateTimeTz(dt) => Box::new(*dt),
        Value::Uuid(u) => Box::new(*u),
        Value::Json(j) => Box::new(j.clone()),
    }
}

fn pg_row_to_row(pg_row: &tokio_postgres::Row) -> Row {
    let columns: Vec<String> = pg_row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let values: Vec<Value> = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| pg_value_to_value(pg_row, i, col.type_()))
        .collect();

    Row::new(columns, values)
}

fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn pg_value_to_value(row: &tokio_postgres::Row, idx: usize, pg_type: &Type) -> Value {
    let value = match *pg_type {
        Type::BOOL => get(row, idx).map(Value::Bool),
        Type::INT2 => get(row, idx).map(Value::Int16),
        Type::INT4 => get(row, idx).map(Value::Int32),
        Type::INT8 => get(row, idx).map(Value::Int64),
        Type::FLOAT4 => get(row, idx).map(Value::Float32),
        Type::FLOAT8 => get(row, idx).map(Value::Float64),
        Type::NUMERIC => get(row, idx).map(Value::Decimal),
        Type::BYTEA => get(row, idx).map(Value::Bytes),
        Type::DATE => get(row, idx).map(Value::Date),
        Type::TIME => get(row, idx).map(Value::Time),
        Type::TIMESTAMP => get(row, idx).map(Value::DateTime),
        Type::TIMESTAMPTZ => get(row, idx).map(Value::DateTimeTz),
        Type::UUID => get(row, idx).map(Value::Uuid),
        Type::JSON | Type::JSONB => get(row, idx).map(Value::Json),
        // text-like and anything else readable as text
        _ => get(row, idx).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}

fn query_error(e: tokio_postgres::Error, sql: &str) -> Error {
    Error::Query {
        message: e.to_string(),
        sql: Some(sql.to_string()),
        source: Some(Box::new(e)),
    }
}

/// PostgreSQL connection
pub struct PgConnection {
    client: RwLock<Option<tokio_postgres::Client>>,
}

impl PgConnection {
    /// Wrap a tokio-postgres client
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self {
            client: RwLock::new(Some(client)),
        }
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(Error::not_connected("query"))?;

        let boxed: Vec<BoxedParam> = params.iter().map(value_to_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = client
            .query(sql, &refs)
            .await
            .map_err(|e| query_error(e, sql))?;
        Ok(rows.iter().map(pg_row_to_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(Error::not_connected("execute"))?;

        let boxed: Vec<BoxedParam> = params.iter().map(value_to_sql).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|b| b.as_ref() as &(dyn ToSql + Sync))
            .collect();

        client
            .execute(sql, &refs)
            .await
            .map_err(|e| query_error(e, sql))
    }

    async fn is_valid(&self) -> bool {
        match self.client.read().await.as_ref() {
            Some(client) => client.simple_query("SELECT 1").await.is_ok(),
            None => false,
        }
    }

    async fn close(&self) -> Result<()> {
        // dropping the client ends the connection task
        self.client
            .write()
            .await
            .take()
            .map(drop)
            .ok_or(Error::not_connected("close"))
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }
}

/// Build the tokio-postgres configuration from the adapter configuration
fn pg_config(config: &ConnectionConfig) -> Result<tokio_postgres::Config> {
    let mut pg: tokio_postgres::Config = config.url.parse().map_err(|e| {
        Error::config(format!(
            "invalid postgres url '{}': {}",
            redact_uri(&config.url),
            e
        ))
    })?;
    pg.connect_timeout(config.connect_timeout());
    if let Some(name) = config
        .option("application_name")
        .or(config.application_name.as_deref())
    {
        pg.application_name(name);
    }
    Ok(pg)
}

/// PostgreSQL connection factory
#[derive(Debug, Clone, Default)]
pub struct PgConnectionFactory;

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let (client, connection) = pg_config(config)?
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| Error::connection_with_source("failed to connect to postgres", e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "PostgreSQL connection task ended with error");
            }
        });

        Ok(Box::new(PgConnection::new(client)))
    }

    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn schema_provider(&self, conn: Arc<dyn Connection>) -> Box<dyn SchemaProvider> {
        Box::new(CatalogSchemaProvider::new(conn, self.dialect()))
    }

    fn type_mapping(&self) -> Arc<TypeMappingTable> {
        TypeMappingTable::postgres()
    }
}
