//! Integration tests for rivven-sql-adapter error module

use rivven_sql_adapter::error::{Error, ErrorCategory};
use rivven_sql_adapter::scheme::Backend;

#[test]
fn test_error_connection() {
    let err = Error::connection("Failed to connect");

    assert_eq!(err.category(), ErrorCategory::Connection);
    assert!(err.to_string().contains("Failed to connect"));
    assert!(err.is_retriable());
}

#[test]
fn test_error_connection_with_source() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory");
    let err = Error::connection_with_source("cannot open database file", io);

    assert!(err.is_retriable());
    let source = std::error::Error::source(&err).map(|s| s.to_string());
    assert_eq!(source.as_deref(), Some("no such directory"));
}

#[test]
fn test_error_config() {
    let err = Error::config("Invalid URL format");

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("Invalid URL format"));
    assert!(!err.is_retriable());
}

#[test]
fn test_error_query() {
    let err = Error::query_with_sql("no such table: ghosts", "SELECT * FROM \"ghosts\"");

    assert_eq!(err.category(), ErrorCategory::Query);
    assert_eq!(err.sql(), Some("SELECT * FROM \"ghosts\""));
    assert!(!err.is_retriable());
    assert_eq!(Error::query("boom").sql(), None);
}

#[test]
fn test_error_scheme() {
    let err = Error::unsupported_scheme("mongodb");
    assert_eq!(err.category(), ErrorCategory::Scheme);
    assert!(err.to_string().contains("mongodb"));

    let err = Error::DriverNotAvailable {
        backend: Backend::Oracle,
    };
    assert_eq!(err.category(), ErrorCategory::Scheme);
    assert!(err.to_string().contains("oracle"));
}

#[test]
fn test_error_state() {
    let err = Error::not_connected("schema");
    assert_eq!(err.category(), ErrorCategory::State);
    assert!(err.to_string().contains("schema"));
    assert!(!err.is_retriable());

    let err = Error::invalid_state("setup called after disconnect");
    assert_eq!(err.category(), ErrorCategory::State);
}

#[test]
fn test_error_unmapped_type() {
    let err = Error::UnmappedType {
        backend: Backend::Sqlite,
        table: "places".into(),
        column: "shape".into(),
        type_token: "GEOMETRY".into(),
    };

    assert_eq!(err.category(), ErrorCategory::TypeMapping);
    let message = err.to_string();
    assert!(message.contains("GEOMETRY"));
    assert!(message.contains("places.shape"));
}

#[test]
fn test_error_table_not_found() {
    let err = Error::table_not_found("ghosts");
    assert_eq!(err.category(), ErrorCategory::Schema);
    assert!(err.to_string().contains("ghosts"));
}

#[test]
fn test_only_connection_errors_retry() {
    let errors = [
        Error::unsupported_scheme("x"),
        Error::not_connected("dataset"),
        Error::table_not_found("t"),
        Error::query("q"),
        Error::type_conversion("t"),
        Error::config("c"),
        Error::internal("i"),
    ];
    assert!(errors.iter().all(|e| !e.is_retriable()));
}

#[test]
fn test_category_display() {
    assert_eq!(ErrorCategory::Connection.to_string(), "connection");
    assert_eq!(ErrorCategory::TypeMapping.to_string(), "type_mapping");
}
