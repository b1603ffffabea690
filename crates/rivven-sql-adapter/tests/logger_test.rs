//! Integration tests for statement logging through the adapter
#![cfg(feature = "sqlite")]

use std::sync::Arc;

use rivven_sql_adapter::prelude::*;

async fn connected() -> SqlAdapter {
    let mut adapter = SqlAdapter::new("sqlite::memory:");
    adapter.setup().await.unwrap();
    adapter
}

#[tokio::test]
async fn test_logger_receives_statements() {
    let mut adapter = connected().await;
    let memory = Arc::new(MemoryLogger::new());
    let logger: Arc<dyn QueryLogger> = memory.clone();
    adapter.set_logger(&logger).unwrap();

    adapter.schema().await.unwrap();

    let entries = memory.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Debug);
    assert!(entries[0].sql.as_deref().unwrap().contains("sqlite_master"));
    assert_eq!(entries[0].message, "0 row(s)");
    assert!(entries[0].elapsed.is_some());
}

#[tokio::test]
async fn test_loggers_accumulate() {
    let mut adapter = connected().await;
    let first = Arc::new(MemoryLogger::new());
    let second = Arc::new(MemoryLogger::new());
    let first_dyn: Arc<dyn QueryLogger> = first.clone();
    let second_dyn: Arc<dyn QueryLogger> = second.clone();

    adapter.set_logger(&first_dyn).unwrap();
    adapter.set_logger(&second_dyn).unwrap();

    adapter
        .connection()
        .unwrap()
        .connection()
        .execute("CREATE TABLE t (id INTEGER)", &[])
        .await
        .unwrap();

    // both sinks stay attached; the accessor reports the latest
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first.entries()[0].message, "0 row(s) affected");
    assert!(Arc::ptr_eq(&adapter.logger().unwrap(), &second_dyn));
}

#[tokio::test]
async fn test_failed_statement_logged_as_error() {
    let mut adapter = connected().await;
    let memory = Arc::new(MemoryLogger::new());
    let logger: Arc<dyn QueryLogger> = memory.clone();
    adapter.set_logger(&logger).unwrap();

    let ghosts = adapter.dataset("ghosts").unwrap();
    assert!(ghosts.all().await.is_err());

    let entries = memory.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Error);
    assert!(entries[0].message.contains("ghosts"));
}

#[tokio::test]
async fn test_temporary_logger_stays_attached() {
    let mut adapter = connected().await;
    let memory = Arc::new(MemoryLogger::new());
    adapter
        .set_logger(&(memory.clone() as Arc<dyn QueryLogger>))
        .unwrap();
    let weak = Arc::downgrade(&memory);
    drop(memory);

    // the connection owns the sink now
    adapter.schema().await.unwrap();
    let memory = weak.upgrade().unwrap();
    assert_eq!(memory.len(), 1);
    assert!(adapter.logger().is_some());
    drop(memory);

    adapter.disconnect().await.unwrap();
    assert!(weak.upgrade().is_none());
    assert!(adapter.logger().is_none());
}

#[tokio::test]
async fn test_tracing_logger_as_temporary() {
    let mut adapter = connected().await;
    adapter
        .set_logger(&(Arc::new(TracingLogger) as Arc<dyn QueryLogger>))
        .unwrap();
    assert!(adapter.logger().is_some());
    adapter.schema().await.unwrap();
}

#[tokio::test]
async fn test_set_logger_requires_connection() {
    let mut adapter = SqlAdapter::new("sqlite::memory:");
    let logger: Arc<dyn QueryLogger> = Arc::new(MemoryLogger::new());
    assert!(matches!(
        adapter.set_logger(&logger),
        Err(Error::NotConnected { .. })
    ));
}
