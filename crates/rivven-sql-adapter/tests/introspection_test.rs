//! Integration tests for schema introspection and type mapping
#![cfg(feature = "sqlite")]

use rivven_sql_adapter::prelude::*;

async fn connected(ddl: &[&str]) -> ConnectionManager {
    let mut manager = ConnectionManager::new(ConnectionConfig::new("sqlite::memory:"));
    let handle = manager.setup().await.unwrap();
    for statement in ddl {
        handle.connection().execute(statement, &[]).await.unwrap();
    }
    manager
}

#[tokio::test]
async fn test_list_tables_sorted() {
    let manager = connected(&[
        "CREATE TABLE zebras (id INTEGER)",
        "CREATE TABLE apples (id INTEGER)",
        "CREATE TABLE mangos (id INTEGER)",
    ])
    .await;

    let tables = SchemaIntrospector::new(&manager).list_tables().await.unwrap();
    assert_eq!(
        tables.into_iter().collect::<Vec<_>>(),
        vec!["apples", "mangos", "zebras"]
    );
}

#[tokio::test]
async fn test_tables_resembling_internal_names_are_listed() {
    let mut adapter = SqlAdapter::new("sqlite::memory:");
    adapter.setup().await.unwrap();
    let conn = adapter.connection().unwrap().connection();
    for ddl in [
        "CREATE TABLE sqlites (id INTEGER)",
        "CREATE TABLE SQLiteStats (id INTEGER)",
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT)",
    ] {
        conn.execute(ddl, &[]).await.unwrap();
    }

    // AUTOINCREMENT creates sqlite_sequence, which stays hidden
    let tables = adapter.schema().await.unwrap();
    assert_eq!(
        tables.into_iter().collect::<Vec<_>>(),
        vec!["SQLiteStats", "sqlites", "users"]
    );
    assert!(adapter.has_dataset("sqlites").await.unwrap());
    assert!(!adapter.has_dataset("sqlite_sequence").await.unwrap());

    let attributes = adapter.attributes("SQLiteStats").await.unwrap();
    assert_eq!(attributes["id"].canonical_type, CanonicalType::Integer);
}

#[tokio::test]
async fn test_table_name_is_bound_in_catalog_queries() {
    let manager = connected(&[r#"CREATE TABLE "it's" (id INTEGER, note TEXT)"#]).await;
    let schema = manager.schema_provider("test").unwrap();

    let table = schema.get_table("it's").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["id", "note"]);

    for hostile in ["x') UNION SELECT 1,2,3,4,5,6 --", "x\\' OR 1=1 -- "] {
        assert!(schema.get_table(hostile).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_empty_database() {
    let manager = connected(&[]).await;
    let tables = SchemaIntrospector::new(&manager).list_tables().await.unwrap();
    assert!(tables.is_empty());
}

#[tokio::test]
async fn test_describe_attributes_preserves_declaration_order() {
    let manager = connected(&[r#"CREATE TABLE events (
            id BIGINT PRIMARY KEY,
            price DECIMAL(10, 2),
            ratio DOUBLE PRECISION,
            label VARCHAR(40),
            active BOOLEAN,
            happened_on DATE,
            happened_at DATETIME,
            starts TIME,
            payload BLOB
        )"#])
    .await;

    let attributes = SchemaIntrospector::new(&manager)
        .describe_attributes("events")
        .await
        .unwrap();

    let described: Vec<(String, CanonicalType)> = attributes
        .into_iter()
        .map(|(name, column)| (name, column.canonical_type))
        .collect();
    assert_eq!(
        described,
        vec![
            ("id".to_string(), CanonicalType::Integer),
            ("price".to_string(), CanonicalType::Decimal),
            ("ratio".to_string(), CanonicalType::Float),
            ("label".to_string(), CanonicalType::String),
            ("active".to_string(), CanonicalType::Boolean),
            ("happened_on".to_string(), CanonicalType::Date),
            ("happened_at".to_string(), CanonicalType::DateTime),
            ("starts".to_string(), CanonicalType::Time),
            ("payload".to_string(), CanonicalType::Binary),
        ]
    );
}

#[tokio::test]
async fn test_unmapped_type_surfaces() {
    let manager = connected(&["CREATE TABLE places (id INTEGER, shape GEOMETRY)"]).await;
    let introspector = SchemaIntrospector::new(&manager);

    // names are still listable
    assert_eq!(
        introspector.list_columns("places").await.unwrap(),
        vec!["id", "shape"]
    );

    let err = introspector.describe_attributes("places").await.unwrap_err();
    match err {
        Error::UnmappedType {
            backend,
            table,
            column,
            type_token,
        } => {
            assert_eq!(backend, Backend::Sqlite);
            assert_eq!(table, "places");
            assert_eq!(column, "shape");
            assert_eq!(type_token, "GEOMETRY");
        }
        other => panic!("expected UnmappedType, got {other:?}"),
    }
}

#[tokio::test]
async fn test_schema_provider_metadata() {
    let manager = connected(&[
        "CREATE TABLE accounts (id INTEGER NOT NULL, email TEXT DEFAULT 'none', PRIMARY KEY (id))",
    ])
    .await;
    let schema = manager.schema_provider("test").unwrap();

    assert!(schema.table_exists("accounts").await.unwrap());
    assert!(!schema.table_exists("ghosts").await.unwrap());
    assert!(schema.get_table("ghosts").await.unwrap().is_none());

    let table = schema.get_table("accounts").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["id", "email"]);
    assert_eq!(table.primary_key(), vec!["id"]);

    let id = table.column("id").unwrap();
    assert!(!id.nullable);
    assert!(id.is_primary_key());
    assert_eq!(id.ordinal, 1);

    let email = table.column("email").unwrap();
    assert!(email.nullable);
    assert!(!email.is_primary_key());
    assert_eq!(email.default_value.as_deref(), Some("'none'"));
}

#[tokio::test]
async fn test_composite_primary_key_order() {
    let manager = connected(&[
        "CREATE TABLE memberships (user_id INTEGER, group_id INTEGER, role TEXT, \
         PRIMARY KEY (group_id, user_id))",
    ])
    .await;
    let schema = manager.schema_provider("test").unwrap();

    let table = schema.get_table("memberships").await.unwrap().unwrap();
    assert_eq!(table.column_names(), vec!["user_id", "group_id", "role"]);
    assert_eq!(table.primary_key(), vec!["group_id", "user_id"]);
}

#[tokio::test]
async fn test_mapping_tables_are_shared() {
    let manager = connected(&[]).await;
    let mapping = manager.type_mapping("test").unwrap();
    assert!(std::sync::Arc::ptr_eq(&mapping, &TypeMappingTable::sqlite()));
    assert_eq!(mapping.lookup("varchar(255)"), Some(CanonicalType::String));
    assert_eq!(mapping.lookup("geometry"), None);
}

#[test]
fn test_mysql_tinyint_one_is_boolean() {
    let mapping = TypeMappingTable::mysql();
    assert_eq!(mapping.lookup("tinyint(1)"), Some(CanonicalType::Boolean));
    assert_eq!(mapping.lookup("tinyint(4)"), Some(CanonicalType::Integer));
    assert_eq!(mapping.lookup("int(11) unsigned"), Some(CanonicalType::Integer));
}

#[test]
fn test_postgres_tokens() {
    let mapping = TypeMappingTable::postgres();
    assert_eq!(
        mapping.lookup("character varying"),
        Some(CanonicalType::String)
    );
    assert_eq!(
        mapping.lookup("timestamp without time zone"),
        Some(CanonicalType::DateTime)
    );
    assert_eq!(mapping.lookup("bytea"), Some(CanonicalType::Binary));
    assert!(mapping.resolve("t", "c", "geography").is_err());
}
