//! SQLite driver for rivven-sql-adapter
//!
//! Backed by `rusqlite`. The client is synchronous, so every call runs on
//! the blocking pool via `tokio::task::spawn_blocking`.
//!
//! Accepted URL forms (after scheme normalization):
//! - `sqlite::memory:`, `sqlite:`, `sqlite://` → in-memory database
//! - `sqlite:path/to.db`, `sqlite://path/to.db` → relative file
//! - `sqlite:///abs/path/to.db` → absolute file
//!
//! Options: `busy_timeout` (ms), `foreign_keys` (`true`/`false`),
//! `journal_mode` (e.g. `wal`).

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::Value as SqliteValue;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::error::{Error, Result};
use crate::scheme::Backend;
use crate::schema::{CatalogSchemaProvider, SchemaProvider};
use crate::security::validate_sql_identifier;
use crate::type_map::TypeMappingTable;
use crate::types::{Row, Value};

const MEMORY: &str = ":memory:";

/// Where an SQLite database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Private in-memory database
    Memory,
    /// Database file
    File(String),
}

impl SqliteTarget {
    /// Parse the part of a connection URL after the scheme
    pub fn from_url(url: &str) -> Self {
        let rest = url.split_once(':').map(|(_, rest)| rest).unwrap_or(url);
        let rest = rest.split_once('?').map(|(path, _)| path).unwrap_or(rest);
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        if rest.is_empty() || rest == MEMORY {
            Self::Memory
        } else {
            Self::File(rest.to_string())
        }
    }
}

/// Convert a driver-neutral value into an SQLite value
fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int16(n) => SqliteValue::Integer(i64::from(*n)),
        Value::Int32(n) => SqliteValue::Integer(i64::from(*n)),
        Value::Int64(n) => SqliteValue::Integer(*n),
        Value::Float32(n) => SqliteValue::Real(f64::from(*n)),
        Value::Float64(n) => SqliteValue::Real(*n),
        Value::Decimal(d) => SqliteValue::Text(d.to_string()),
        Value::String(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Date(d) => SqliteValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => SqliteValue::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::DateTime(dt) => SqliteValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::DateTimeTz(dt) => SqliteValue::Text(dt.to_rfc3339()),
        Value::Uuid(u) => SqliteValue::Text(u.to_string()),
        Value::Json(j) => SqliteValue::Text(j.to_string()),
    }
}

fn from_sqlite(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(n) => Value::Int64(n),
        SqliteValue::Real(n) => Value::Float64(n),
        SqliteValue::Text(s) => Value::String(s),
        SqliteValue::Blob(b) => Value::Bytes(b),
    }
}

fn query_error(e: rusqlite::Error, sql: &str) -> Error {
    Error::Query {
        message: e.to_string(),
        sql: Some(sql.to_string()),
        source: Some(Box::new(e)),
    }
}

fn run_query(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[SqliteValue],
) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql).map_err(|e| query_error(e, sql))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(|e| query_error(e, sql))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| query_error(e, sql))? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value: SqliteValue = row.get(idx).map_err(|e| query_error(e, sql))?;
            values.push(from_sqlite(value));
        }
        out.push(Row::new(columns.clone(), values));
    }
    Ok(out)
}

fn apply_options(conn: &rusqlite::Connection, config: &ConnectionConfig) -> Result<()> {
    if let Some(ms) = config.option("busy_timeout") {
        let ms: u64 = ms.parse().map_err(|_| {
            Error::config(format!("busy_timeout must be milliseconds, got '{}'", ms))
        })?;
        conn.busy_timeout(Duration::from_millis(ms))
            .map_err(|e| Error::connection_with_source("failed to set busy_timeout", e))?;
    }

    if let Some(flag) = config.option("foreign_keys") {
        let enabled = Value::String(flag.to_string()).as_bool().ok_or_else(|| {
            Error::config(format!("foreign_keys must be a boolean, got '{}'", flag))
        })?;
        conn.pragma_update(None, "foreign_keys", enabled)
            .map_err(|e| Error::connection_with_source("failed to set foreign_keys", e))?;
    }

    if let Some(mode) = config.option("journal_mode") {
        validate_sql_identifier(mode)?;
        conn.pragma_update(None, "journal_mode", mode)
            .map_err(|e| Error::connection_with_source("failed to set journal_mode", e))?;
    }

    Ok(())
}

/// SQLite connection
pub struct SqliteConnection {
    conn: Arc<Mutex<Option<rusqlite::Connection>>>,
}

impl SqliteConnection {
    fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Run a closure against the live client on the blocking pool
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            let client = guard.as_ref().ok_or(Error::not_connected(operation))?;
            f(client)
        })
        .await
        .map_err(|e| Error::internal(format!("sqlite worker failed: {}", e)))?
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        let params: Vec<_> = params.iter().map(to_sqlite).collect();
        self.with_conn("query", move |conn| run_query(conn, &sql, &params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let sql = sql.to_string();
        let params: Vec<_> = params.iter().map(to_sqlite).collect();
        self.with_conn("execute", move |conn| {
            let affected = conn
                .execute(&sql, rusqlite::params_from_iter(params.iter()))
                .map_err(|e| query_error(e, &sql))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn is_valid(&self) -> bool {
        self.with_conn("is_valid", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| query_error(e, "SELECT 1"))
        })
        .await
        .is_ok()
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let client = conn.lock().take().ok_or(Error::not_connected("close"))?;
            client.close().map_err(|(_, e)| {
                Error::connection_with_source("failed to close sqlite database", e)
            })
        })
        .await
        .map_err(|e| Error::internal(format!("sqlite worker failed: {}", e)))?
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}

/// SQLite connection factory
#[derive(Debug, Clone, Default)]
pub struct SqliteConnectionFactory;

#[async_trait]
impl ConnectionFactory for SqliteConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let target = SqliteTarget::from_url(&config.url);

        if let SqliteTarget::File(path) = &target {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(Error::connection(format!(
                        "parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }
        }

        let config = config.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = match &target {
                SqliteTarget::Memory => rusqlite::Connection::open_in_memory(),
                SqliteTarget::File(path) => rusqlite::Connection::open(path),
            }
            .map_err(|e| Error::connection_with_source("failed to open sqlite database", e))?;
            apply_options(&conn, &config)?;
            Ok::<_, Error>(conn)
        })
        .await
        .map_err(|e| Error::internal(format!("sqlite worker failed: {}", e)))??;

        Ok(Box::new(SqliteConnection::new(conn)))
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn schema_provider(&self, conn: Arc<dyn Connection>) -> Box<dyn SchemaProvider> {
        Box::new(CatalogSchemaProvider::new(conn, self.dialect()))
    }

    fn type_mapping(&self) -> Arc<TypeMappingTable> {
        TypeMappingTable::sqlite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> Box<dyn Connection> {
        SqliteConnectionFactory
            .connect(&ConnectionConfig::new("sqlite::memory:"))
            .await
            .unwrap()
    }

    #[test]
    fn test_target_from_url() {
        assert_eq!(SqliteTarget::from_url("sqlite::memory:"), SqliteTarget::Memory);
        assert_eq!(SqliteTarget::from_url("sqlite:"), SqliteTarget::Memory);
        assert_eq!(SqliteTarget::from_url("sqlite://"), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::from_url("sqlite:data/app.db"),
            SqliteTarget::File("data/app.db".into())
        );
        assert_eq!(
            SqliteTarget::from_url("sqlite://app.db"),
            SqliteTarget::File("app.db".into())
        );
        assert_eq!(
            SqliteTarget::from_url("sqlite:///var/lib/app.db?mode=rwc"),
            SqliteTarget::File("/var/lib/app.db".into())
        );
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(to_sqlite(&Value::Bool(true)), SqliteValue::Integer(1));
        assert_eq!(to_sqlite(&Value::Int32(7)), SqliteValue::Integer(7));
        assert_eq!(to_sqlite(&Value::Null), SqliteValue::Null);
        assert_eq!(from_sqlite(SqliteValue::Text("a".into())), Value::String("a".into()));
        assert_eq!(from_sqlite(SqliteValue::Blob(vec![1])), Value::Bytes(vec![1]));
    }

    #[tokio::test]
    async fn test_query_and_execute() {
        let conn = memory().await;
        conn.execute("CREATE TABLE t (id INTEGER, name TEXT)", &[])
            .await
            .unwrap();
        let affected = conn
            .execute(
                "INSERT INTO t (id, name) VALUES (?, ?)",
                &[Value::Int64(1), Value::String("a".into())],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = conn.query("SELECT id, name FROM t", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int64(1)));
        assert_eq!(rows[0].columns(), &["id".to_string(), "name".to_string()]);

        assert!(conn.is_valid().await);
    }

    #[tokio::test]
    async fn test_query_error_carries_sql() {
        let conn = memory().await;
        let err = conn.query("SELECT * FROM nowhere", &[]).await.unwrap_err();
        assert_eq!(err.sql(), Some("SELECT * FROM nowhere"));
    }

    #[tokio::test]
    async fn test_close_twice() {
        let conn = memory().await;
        conn.close().await.unwrap();
        assert!(!conn.is_valid().await);
        assert!(matches!(
            conn.close().await,
            Err(Error::NotConnected { .. })
        ));
        assert!(matches!(
            conn.query("SELECT 1", &[]).await,
            Err(Error::NotConnected { operation: "query" })
        ));
    }

    #[tokio::test]
    async fn test_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/missing/app.db", dir.path().display());
        let err = SqliteConnectionFactory
            .connect(&ConnectionConfig::new(url))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn test_options() {
        let config = ConnectionConfig::new("sqlite::memory:")
            .with_option("busy_timeout", "250")
            .with_option("foreign_keys", "true");
        let conn = SqliteConnectionFactory.connect(&config).await.unwrap();
        let rows = conn.query("PRAGMA foreign_keys", &[]).await.unwrap();
        assert_eq!(rows[0].get(0), Some(&Value::Int64(1)));

        let config = ConnectionConfig::new("sqlite::memory:").with_option("busy_timeout", "soon");
        let err = SqliteConnectionFactory.connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));

        let config =
            ConnectionConfig::new("sqlite::memory:").with_option("journal_mode", "wal; --");
        let err = SqliteConnectionFactory.connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
