//! SQL dialects
//!
//! Generates the handful of statements a dataset handle and the catalog
//! provider need, using sea-query for type-safe building on every bundled
//! backend (SQLite, PostgreSQL, MySQL).
//!
//! Catalog queries return one shape regardless of backend, consumed by
//! [`crate::schema::CatalogSchemaProvider`]:
//!
//! | idx | column         | meaning                                   |
//! |-----|----------------|-------------------------------------------|
//! | 0   | column name    | text                                      |
//! | 1   | native type    | text, backend type token                  |
//! | 2   | nullable       | bool or 0/1                               |
//! | 3   | ordinal        | 1-based declaration position              |
//! | 4   | default        | text or NULL                              |
//! | 5   | pk ordinal     | 1-based, NULL or 0 when not a key column  |

use std::sync::Arc;

use sea_query::{
    Alias, Asterisk, Expr, IntoIden, MysqlQueryBuilder, PostgresQueryBuilder, Query,
    SqliteQueryBuilder, TableRef,
};

use crate::error::{Error, Result};
use crate::scheme::Backend;

fn sea_table_ref(table: &str) -> TableRef {
    TableRef::Table(Alias::new(table).into_iden())
}

/// Per-backend SQL text: quoting, placeholders, catalog and dataset statements
pub trait SqlDialect: Send + Sync {
    /// Human-readable dialect label
    fn name(&self) -> &'static str;

    /// Wrap a table or column name in the backend's identifier quotes
    fn quote_identifier(&self, name: &str) -> String;

    /// Bind marker for the 1-based parameter `index` (`$1` or `?`)
    fn placeholder(&self, index: usize) -> String;

    /// SQL listing user tables, one name per row
    fn list_tables_sql(&self) -> String;

    /// SQL listing the columns of a table in the catalog row shape
    ///
    /// The table name is the statement's only bound parameter. Callers pass
    /// names straight from user input, so it never becomes SQL text.
    fn list_columns_sql(&self) -> String;

    /// Build a SELECT over a whole table
    fn build_select(&self, table: &str, columns: &[&str], limit: Option<u64>) -> String;

    /// Build a `SELECT COUNT(*)` over a whole table
    fn build_count(&self, table: &str) -> String;

    /// Build a single-row INSERT with one placeholder per column
    fn build_insert(&self, table: &str, columns: &[&str]) -> Result<String>;

    /// Build an unconditional DELETE
    fn build_delete(&self, table: &str) -> String;
}

fn select_stmt(table: &str, columns: &[&str], limit: Option<u64>) -> sea_query::SelectStatement {
    let mut stmt = Query::select();
    stmt.from(sea_table_ref(table));

    if columns.is_empty() {
        stmt.column(Asterisk);
    } else {
        for col in columns {
            stmt.column(Alias::new(*col));
        }
    }

    if let Some(l) = limit {
        stmt.limit(l);
    }
    stmt
}

fn count_stmt(table: &str) -> sea_query::SelectStatement {
    let mut stmt = Query::select();
    stmt.expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
        .from(sea_table_ref(table));
    stmt
}

fn insert_stmt(
    table: &str,
    columns: &[&str],
    placeholder: impl Fn(usize) -> String,
) -> Result<sea_query::InsertStatement> {
    let col_idens: Vec<_> = columns.iter().map(|c| Alias::new(*c).into_iden()).collect();
    let values: Vec<_> = (1..=columns.len())
        .map(|i| Expr::cust(placeholder(i)))
        .collect();

    let mut stmt = Query::insert();
    stmt.into_table(sea_table_ref(table)).columns(col_idens);
    stmt.values(values)
        .map_err(|e| Error::query(format!("failed to build insert for {}: {}", table, e)))?;
    Ok(stmt)
}

fn delete_stmt(table: &str) -> sea_query::DeleteStatement {
    let mut stmt = Query::delete();
    stmt.from_table(sea_table_ref(table));
    stmt
}

// ===========================================================================
// SQLite
// ===========================================================================

/// SQLite dialect
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn list_tables_sql(&self) -> String {
        // LIKE would treat `_` as a wildcard and ignore case
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' \
         ORDER BY name"
            .to_string()
    }

    fn list_columns_sql(&self) -> String {
        r#"SELECT name, type, "notnull" = 0, cid + 1, dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid"#
            .to_string()
    }

    fn build_select(&self, table: &str, columns: &[&str], limit: Option<u64>) -> String {
        select_stmt(table, columns, limit).to_string(SqliteQueryBuilder)
    }

    fn build_count(&self, table: &str) -> String {
        count_stmt(table).to_string(SqliteQueryBuilder)
    }

    fn build_insert(&self, table: &str, columns: &[&str]) -> Result<String> {
        if columns.is_empty() {
            return Ok(format!(
                "INSERT INTO {} DEFAULT VALUES",
                self.quote_identifier(table)
            ));
        }
        Ok(insert_stmt(table, columns, |i| self.placeholder(i))?.to_string(SqliteQueryBuilder))
    }

    fn build_delete(&self, table: &str) -> String {
        delete_stmt(table).to_string(SqliteQueryBuilder)
    }
}

// ===========================================================================
// PostgreSQL
// ===========================================================================

/// PostgreSQL dialect
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn list_tables_sql(&self) -> String {
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
            .to_string()
    }

    fn list_columns_sql(&self) -> String {
        r#"SELECT
                c.column_name::text,
                (CASE WHEN c.data_type = 'USER-DEFINED' THEN c.udt_name ELSE c.data_type END)::text,
                c.is_nullable = 'YES',
                c.ordinal_position::int4,
                c.column_default::text,
                pk.ordinal_position::int4
            FROM information_schema.columns c
            LEFT JOIN (
                SELECT ku.column_name, ku.ordinal_position
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage ku
                    ON tc.constraint_name = ku.constraint_name
                    AND tc.table_schema = ku.table_schema
                    AND tc.table_name = ku.table_name
                WHERE tc.constraint_type = 'PRIMARY KEY'
                    AND tc.table_schema = current_schema()
                    AND tc.table_name::text = $1::text
            ) pk ON c.column_name = pk.column_name
            WHERE c.table_schema = current_schema() AND c.table_name::text = $1::text
            ORDER BY c.ordinal_position"#
            .to_string()
    }

    fn build_select(&self, table: &str, columns: &[&str], limit: Option<u64>) -> String {
        select_stmt(table, columns, limit).to_string(PostgresQueryBuilder)
    }

    fn build_count(&self, table: &str) -> String {
        count_stmt(table).to_string(PostgresQueryBuilder)
    }

    fn build_insert(&self, table: &str, columns: &[&str]) -> Result<String> {
        if columns.is_empty() {
            return Ok(format!(
                "INSERT INTO {} DEFAULT VALUES",
                self.quote_identifier(table)
            ));
        }
        Ok(insert_stmt(table, columns, |i| self.placeholder(i))?.to_string(PostgresQueryBuilder))
    }

    fn build_delete(&self, table: &str) -> String {
        delete_stmt(table).to_string(PostgresQueryBuilder)
    }
}

// ===========================================================================
// MySQL
// ===========================================================================

/// MySQL dialect
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn list_tables_sql(&self) -> String {
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
            .to_string()
    }

    fn list_columns_sql(&self) -> String {
        // column_type keeps display widths, so tinyint(1) stays distinguishable
        r#"SELECT
                column_name,
                column_type,
                is_nullable = 'YES',
                ordinal_position,
                column_default,
                CASE WHEN column_key = 'PRI' THEN ordinal_position END
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position"#
            .to_string()
    }

    fn build_select(&self, table: &str, columns: &[&str], limit: Option<u64>) -> String {
        select_stmt(table, columns, limit).to_string(MysqlQueryBuilder)
    }

    fn build_count(&self, table: &str) -> String {
        count_stmt(table).to_string(MysqlQueryBuilder)
    }

    fn build_insert(&self, table: &str, columns: &[&str]) -> Result<String> {
        if columns.is_empty() {
            return Ok(format!(
                "INSERT INTO {} () VALUES ()",
                self.quote_identifier(table)
            ));
        }
        Ok(insert_stmt(table, columns, |i| self.placeholder(i))?.to_string(MysqlQueryBuilder))
    }

    fn build_delete(&self, table: &str) -> String {
        delete_stmt(table).to_string(MysqlQueryBuilder)
    }
}

/// Get the dialect for a backend kind
///
/// Backends without a bundled dialect fall back to PostgreSQL syntax.
pub fn dialect_for(backend: Backend) -> Arc<dyn SqlDialect> {
    match backend {
        Backend::Sqlite | Backend::Amalgalite => Arc::new(SqliteDialect),
        Backend::MySql | Backend::MySql2 => Arc::new(MySqlDialect),
        _ => Arc::new(PostgresDialect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect;
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert_eq!(dialect.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(dialect.placeholder(3), "?");
        assert!(dialect.list_tables_sql().contains("sqlite_master"));
        assert!(!dialect.list_tables_sql().contains("LIKE"));
        assert!(dialect.list_columns_sql().contains("pragma_table_info(?)"));
    }

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert_eq!(dialect.placeholder(1), "$1");
        let sql = dialect.list_columns_sql();
        assert_eq!(sql.matches("$1::text").count(), 2);
    }

    #[test]
    fn test_mysql_dialect() {
        let dialect = MySqlDialect;
        assert_eq!(dialect.quote_identifier("users"), "`users`");
        assert_eq!(dialect.placeholder(1), "?");
        let sql = dialect.list_columns_sql();
        assert!(sql.contains("column_type"));
        assert!(sql.contains("table_name = ?"));
    }

    #[test]
    fn test_build_select() {
        let sql = SqliteDialect.build_select("users", &[], None);
        assert_eq!(sql, r#"SELECT * FROM "users""#);

        let sql = PostgresDialect.build_select("users", &["id", "name"], Some(1));
        assert!(sql.contains(r#""id", "name""#));
        assert!(sql.contains("LIMIT 1"));

        let sql = MySqlDialect.build_select("logs", &["ts"], Some(50));
        assert!(sql.contains("`logs`"));
        assert!(sql.contains("LIMIT 50"));
    }

    #[test]
    fn test_build_count() {
        let sql = SqliteDialect.build_count("users");
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(sql.contains(r#"FROM "users""#));
    }

    #[test]
    fn test_build_insert() {
        let sql = PostgresDialect
            .build_insert("users", &["id", "name"])
            .unwrap();
        assert!(sql.starts_with("INSERT INTO"));
        assert!(sql.contains("$1"));
        assert!(sql.contains("$2"));

        let sql = MySqlDialect.build_insert("orders", &["id", "total"]).unwrap();
        assert!(sql.contains("VALUES (?, ?)"));

        let sql = SqliteDialect.build_insert("users", &[]).unwrap();
        assert_eq!(sql, r#"INSERT INTO "users" DEFAULT VALUES"#);
    }

    #[test]
    fn test_build_delete() {
        assert_eq!(SqliteDialect.build_delete("users"), r#"DELETE FROM "users""#);
        assert_eq!(MySqlDialect.build_delete("users"), "DELETE FROM `users`");
    }

    #[test]
    fn test_dialect_for() {
        assert_eq!(dialect_for(Backend::Sqlite).name(), "SQLite");
        assert_eq!(dialect_for(Backend::Postgres).name(), "PostgreSQL");
        assert_eq!(dialect_for(Backend::MySql2).name(), "MySQL");
        assert_eq!(dialect_for(Backend::Oracle).name(), "PostgreSQL");
    }
}
