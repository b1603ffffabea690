//! Statement trace sinks
//!
//! Attached sinks are owned by the connection's registry, so a logger passed
//! as a temporary keeps receiving entries. Every attached sink sees every
//! statement in attachment order, and duplicates are allowed.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::connection::Connection;
use crate::error::Result;
use crate::scheme::Backend;
use crate::types::{Row, Value};

/// Severity of a trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Statement text and timing
    Debug,
    /// Lifecycle events
    Info,
    /// Failed statements
    Error,
}

/// A single trace record
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,
    /// Human-readable message
    pub message: String,
    /// Statement text, when the entry traces a statement
    pub sql: Option<String>,
    /// Statement duration
    pub elapsed: Option<Duration>,
}

impl LogEntry {
    /// Create an entry without statement context
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            sql: None,
            elapsed: None,
        }
    }

    /// Entry for a statement that ran
    pub fn statement(sql: &str, elapsed: Duration, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Debug,
            message: message.into(),
            sql: Some(sql.to_string()),
            elapsed: Some(elapsed),
        }
    }

    /// Entry for a statement that failed
    pub fn failure(sql: &str, elapsed: Duration, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            ..Self::statement(sql, elapsed, message)
        }
    }
}

/// Diagnostics sink
pub trait QueryLogger: Send + Sync {
    /// Record an entry
    fn log(&self, entry: &LogEntry);
}

/// Logger that keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop all recorded entries
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl QueryLogger for MemoryLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().push(entry.clone());
    }
}

/// Logger that forwards entries to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl QueryLogger for TracingLogger {
    fn log(&self, entry: &LogEntry) {
        let elapsed_us = entry.elapsed.map(|d| d.as_micros() as u64);
        let sql = entry.sql.as_deref().unwrap_or("");
        match entry.level {
            LogLevel::Debug => tracing::debug!(sql, elapsed_us, "{}", entry.message),
            LogLevel::Info => tracing::info!(sql, elapsed_us, "{}", entry.message),
            LogLevel::Error => tracing::error!(sql, elapsed_us, "{}", entry.message),
        }
    }
}

/// Ordered list of attached sinks
#[derive(Default)]
pub struct LoggerRegistry {
    sinks: RwLock<Vec<Arc<dyn QueryLogger>>>,
}

impl LoggerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink; the same logger may be attached more than once
    pub fn attach(&self, logger: &Arc<dyn QueryLogger>) {
        self.sinks.write().push(Arc::clone(logger));
    }

    /// Number of attached sinks, counting duplicates
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    /// Whether no sink is attached
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    /// Release every sink
    pub fn clear(&self) {
        self.sinks.write().clear();
    }

    /// Emit an entry to every sink
    pub fn emit(&self, entry: &LogEntry) {
        // sinks may log re-entrantly, so don't hold the lock while calling out
        let sinks = self.sinks.read().clone();
        for sink in sinks {
            sink.log(entry);
        }
    }
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("sinks", &self.len())
            .finish()
    }
}

/// Connection wrapper that traces every statement to a logger registry
pub struct LoggedConnection {
    inner: Box<dyn Connection>,
    loggers: Arc<LoggerRegistry>,
}

impl LoggedConnection {
    /// Wrap a connection
    pub fn new(inner: Box<dyn Connection>, loggers: Arc<LoggerRegistry>) -> Self {
        Self { inner, loggers }
    }

    fn trace<T>(
        &self,
        sql: &str,
        started: Instant,
        result: &Result<T>,
        describe: impl Fn(&T) -> String,
    ) {
        let elapsed = started.elapsed();
        let entry = match result {
            Ok(value) => LogEntry::statement(sql, elapsed, describe(value)),
            Err(e) => LogEntry::failure(sql, elapsed, e.to_string()),
        };
        tracing::debug!(
            backend = %self.inner.backend(),
            elapsed_us = elapsed.as_micros() as u64,
            failure = result.as_ref().err().map(|e| e.category().as_str()),
            "{}",
            sql
        );
        self.loggers.emit(&entry);
    }
}

#[async_trait]
impl Connection for LoggedConnection {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let started = Instant::now();
        let result = self.inner.query(sql, params).await;
        self.trace(sql, started, &result, |rows| format!("{} row(s)", rows.len()));
        result
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let started = Instant::now();
        let result = self.inner.execute(sql, params).await;
        self.trace(sql, started, &result, |n| format!("{} row(s) affected", n));
        result
    }

    async fn is_valid(&self) -> bool {
        self.inner.is_valid().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn backend(&self) -> Backend {
        self.inner.backend()
    }
}
