//! MySQL driver for rivven-sql-adapter
//!
//! Backed by `mysql_async`. Serves both the `mysql` and `mysql2` schemes;
//! the latter is rewritten to `mysql` before the URL reaches the driver.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
use crate::error::{Error, Result};
use crate::scheme::{redact_uri, replace_scheme, Backend};
use crate::schema::{CatalogSchemaProvider, SchemaProvider};
use crate::type_map::TypeMappingTable;
use crate::types::{Row, Value};

/// Convert a driver-neutral value to a MySQL parameter
fn value_to_sql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::from(*b),
        Value::Int16(n) => mysql_async::Value::from(*n),
        Value::Int32(n) => mysql_async::Value::from(*n),
        Value::Int64(n) => mysql_async::Value::from(*n),
        Value::Float32(n) => mysql_async::Value::from(*n),
        Value::Float64(n) => mysql_async::Value::from(*n),
        // DECIMAL travels as text to keep precision
        Value::Decimal(d) => mysql_async::Value::from(d.to_string()),
        Value::String(s) => mysql_async::Value::from(s.clone()),
        Value::Bytes(b) => mysql_async::Value::from(b.clone()),
        Value::Date(d) => date_value(d, &NaiveTime::MIN),
        Value::Time(t) => mysql_async::Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1000,
        ),
        Value::DateTime(dt) => date_value(&dt.date(), &dt.time()),
        Value::DateTimeTz(dt) => {
            let naive = dt.naive_utc();
            date_value(&naive.date(), &naive.time())
        }
        Value::Uuid(u) => mysql_async::Value::from(u.to_string()),
        Value::Json(j) => mysql_async::Value::from(j.to_string()),
    }
}

fn date_value(date: &NaiveDate, time: &NaiveTime) -> mysql_async::Value {
    mysql_async::Value::Date(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        time.nanosecond() / 1000,
    )
}

/// Convert a MySQL value to a driver-neutral value
fn mysql_value_to_value(val: mysql_async::Value) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        // text protocol results arrive as bytes
        mysql_async::Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(n) => Value::Int64(n),
        mysql_async::Value::UInt(n) => match i64::try_from(n) {
            Ok(n) => Value::Int64(n),
            Err(_) => Value::String(n.to_string()),
        },
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let Some(date) = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32) else {
                return Value::Null;
            };
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                return Value::Date(date);
            }
            NaiveTime::from_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                .map(|time| Value::DateTime(NaiveDateTime::new(date, time)))
                .unwrap_or(Value::Null)
        }
        // TIME columns may hold durations; those outside a clock day stay textual
        mysql_async::Value::Time(neg, days, hour, min, sec, micro) => {
            if neg || days > 0 {
                let sign = if neg { "-" } else { "" };
                let hours = days * 24 + hour as u32;
                return Value::String(format!(
                    "{sign}{hours:02}:{min:02}:{sec:02}.{micro:06}"
                ));
            }
            NaiveTime::from_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                .map(Value::Time)
                .unwrap_or(Value::Null)
        }
    }
}

fn mysql_row_to_row(row: mysql_async::Row) -> Row {
    let columns: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().to_string())
        .collect();
    let values: Vec<Value> = (0..row.len())
        .map(|i| mysql_value_to_value(row.get(i).unwrap_or(mysql_async::Value::NULL)))
        .collect();
    Row::new(columns, values)
}

fn query_error(e: mysql_async::Error, sql: &str) -> Error {
    Error::Query {
        message: e.to_string(),
        sql: Some(sql.to_string()),
        source: Some(Box::new(e)),
    }
}

fn params(values: &[Value]) -> mysql_async::Params {
    if values.is_empty() {
        mysql_async::Params::Empty
    } else {
        mysql_async::Params::Positional(values.iter().map(value_to_sql).collect())
    }
}

/// MySQL connection
pub struct MySqlConnection {
    conn: Mutex<Option<Conn>>,
}

impl MySqlConnection {
    /// Wrap an established `mysql_async` connection
    pub fn new(conn: Conn) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn query(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(Error::not_connected("query"))?;

        let rows: Vec<mysql_async::Row> = conn
            .exec(sql, params(values))
            .await
            .map_err(|e| query_error(e, sql))?;
        Ok(rows.into_iter().map(mysql_row_to_row).collect())
    }

    async fn execute(&self, sql: &str, values: &[Value]) -> Result<u64> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(Error::not_connected("execute"))?;

        conn.exec_drop(sql, params(values))
            .await
            .map_err(|e| query_error(e, sql))?;
        Ok(conn.affected_rows())
    }

    async fn is_valid(&self) -> bool {
        match self.conn.lock().await.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .await
            .take()
            .ok_or(Error::not_connected("close"))?;
        conn.disconnect()
            .await
            .map_err(|e| Error::connection_with_source("failed to close mysql connection", e))
    }

    fn backend(&self) -> Backend {
        Backend::MySql
    }
}

/// Build `mysql_async` options from the adapter configuration
fn mysql_opts(config: &ConnectionConfig) -> Result<Opts> {
    let url = if config.url.starts_with("mysql2:") {
        replace_scheme(&config.url, "mysql")
    } else {
        config.url.clone()
    };
    Opts::from_url(&url).map_err(|e| {
        Error::config(format!(
            "invalid mysql url '{}': {}",
            redact_uri(&config.url),
            e
        ))
    })
}

/// MySQL connection factory
#[derive(Debug, Clone, Default)]
pub struct MySqlConnectionFactory;

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let opts = mysql_opts(config)?;
        let timeout = config.connect_timeout();

        let conn = tokio::time::timeout(timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "timed out connecting to mysql after {}ms",
                    config.connect_timeout_ms
                ))
            })?
            .map_err(|e| Error::connection_with_source("failed to connect to mysql", e))?;

        Ok(Box::new(MySqlConnection::new(conn)))
    }

    fn backend(&self) -> Backend {
        Backend::MySql
    }

    fn schema_provider(&self, conn: Arc<dyn Connection>) -> Box<dyn SchemaProvider> {
        Box::new(CatalogSchemaProvider::new(conn, self.dialect()))
    }

    fn type_mapping(&self) -> Arc<TypeMappingTable> {
        TypeMappingTable::mysql()
    }
}
