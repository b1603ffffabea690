//! Backend-native type token → canonical type mapping
//!
//! One read-only table per backend kind, built once and shared by every
//! adapter targeting that backend. Tokens are normalized before lookup
//! (case, whitespace, then length/precision modifiers), so `VARCHAR(255)`,
//! `varchar` and `character varying(40)` resolve through the same entries.
//!
//! A miss is never coerced to a default: `resolve` surfaces
//! [`Error::UnmappedType`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::error::{Error, Result};
use crate::scheme::Backend;
use crate::types::CanonicalType;

use CanonicalType as T;

const SQLITE_TYPES: &[(&str, CanonicalType)] = &[
    ("integer", T::Integer),
    ("int", T::Integer),
    ("tinyint", T::Integer),
    ("smallint", T::Integer),
    ("mediumint", T::Integer),
    ("bigint", T::Integer),
    ("unsigned big int", T::Integer),
    ("int2", T::Integer),
    ("int8", T::Integer),
    ("real", T::Float),
    ("double", T::Float),
    ("double precision", T::Float),
    ("float", T::Float),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("text", T::String),
    ("varchar", T::String),
    ("varying character", T::String),
    ("character varying", T::String),
    ("char", T::String),
    ("character", T::String),
    ("nchar", T::String),
    ("native character", T::String),
    ("nvarchar", T::String),
    ("clob", T::String),
    ("string", T::String),
    ("boolean", T::Boolean),
    ("bool", T::Boolean),
    ("date", T::Date),
    ("datetime", T::DateTime),
    ("timestamp", T::DateTime),
    ("time", T::Time),
    ("blob", T::Binary),
];

const POSTGRES_TYPES: &[(&str, CanonicalType)] = &[
    ("smallint", T::Integer),
    ("integer", T::Integer),
    ("bigint", T::Integer),
    ("int2", T::Integer),
    ("int4", T::Integer),
    ("int8", T::Integer),
    ("smallserial", T::Integer),
    ("serial", T::Integer),
    ("bigserial", T::Integer),
    ("real", T::Float),
    ("double precision", T::Float),
    ("float4", T::Float),
    ("float8", T::Float),
    ("numeric", T::Decimal),
    ("decimal", T::Decimal),
    ("money", T::Decimal),
    ("text", T::String),
    ("character varying", T::String),
    ("varchar", T::String),
    ("character", T::String),
    ("char", T::String),
    ("bpchar", T::String),
    ("name", T::String),
    ("citext", T::String),
    ("boolean", T::Boolean),
    ("bool", T::Boolean),
    ("date", T::Date),
    ("timestamp without time zone", T::DateTime),
    ("timestamp with time zone", T::DateTime),
    ("timestamp", T::DateTime),
    ("timestamptz", T::DateTime),
    ("time without time zone", T::Time),
    ("time with time zone", T::Time),
    ("time", T::Time),
    ("timetz", T::Time),
    ("bytea", T::Binary),
];

const MYSQL_TYPES: &[(&str, CanonicalType)] = &[
    ("tinyint(1)", T::Boolean),
    ("tinyint", T::Integer),
    ("smallint", T::Integer),
    ("mediumint", T::Integer),
    ("int", T::Integer),
    ("integer", T::Integer),
    ("bigint", T::Integer),
    ("year", T::Integer),
    ("float", T::Float),
    ("double", T::Float),
    ("real", T::Float),
    ("decimal", T::Decimal),
    ("numeric", T::Decimal),
    ("char", T::String),
    ("varchar", T::String),
    ("tinytext", T::String),
    ("text", T::String),
    ("mediumtext", T::String),
    ("longtext", T::String),
    ("enum", T::String),
    ("set", T::String),
    ("bool", T::Boolean),
    ("boolean", T::Boolean),
    ("bit(1)", T::Boolean),
    ("date", T::Date),
    ("datetime", T::DateTime),
    ("timestamp", T::DateTime),
    ("time", T::Time),
    ("binary", T::Binary),
    ("varbinary", T::Binary),
    ("tinyblob", T::Binary),
    ("blob", T::Binary),
    ("mediumblob", T::Binary),
    ("longblob", T::Binary),
];

static SQLITE_MAPPING: LazyLock<Arc<TypeMappingTable>> = LazyLock::new(|| {
    Arc::new(TypeMappingTable::new(
        Backend::Sqlite,
        SQLITE_TYPES.iter().copied(),
    ))
});

static POSTGRES_MAPPING: LazyLock<Arc<TypeMappingTable>> = LazyLock::new(|| {
    Arc::new(TypeMappingTable::new(
        Backend::Postgres,
        POSTGRES_TYPES.iter().copied(),
    ))
});

static MYSQL_MAPPING: LazyLock<Arc<TypeMappingTable>> = LazyLock::new(|| {
    Arc::new(TypeMappingTable::new(
        Backend::MySql,
        MYSQL_TYPES.iter().copied(),
    ))
});

/// Per-backend mapping from native type token to canonical type
#[derive(Debug, Clone)]
pub struct TypeMappingTable {
    backend: Backend,
    entries: HashMap<String, CanonicalType>,
}

impl TypeMappingTable {
    /// Build a table from `(token, canonical type)` pairs
    ///
    /// Tokens are normalized on insertion.
    pub fn new<'a>(
        backend: Backend,
        entries: impl IntoIterator<Item = (&'a str, CanonicalType)>,
    ) -> Self {
        Self {
            backend,
            entries: entries
                .into_iter()
                .map(|(token, ty)| (normalize_token(token), ty))
                .collect(),
        }
    }

    /// Shared table for a backend kind, if one is bundled
    pub fn for_backend(backend: Backend) -> Option<Arc<Self>> {
        match backend {
            Backend::Sqlite | Backend::Amalgalite => Some(Self::sqlite()),
            Backend::Postgres => Some(Self::postgres()),
            Backend::MySql | Backend::MySql2 => Some(Self::mysql()),
            _ => None,
        }
    }

    /// Shared SQLite table
    pub fn sqlite() -> Arc<Self> {
        Arc::clone(&SQLITE_MAPPING)
    }

    /// Shared PostgreSQL table
    pub fn postgres() -> Arc<Self> {
        Arc::clone(&POSTGRES_MAPPING)
    }

    /// Shared MySQL table
    pub fn mysql() -> Arc<Self> {
        Arc::clone(&MYSQL_MAPPING)
    }

    /// Backend this table describes
    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Number of mapped tokens
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a native token
    ///
    /// The full normalized token wins over its modifier-stripped base, so
    /// MySQL's `tinyint(1)` stays boolean while `tinyint(4)` is an integer.
    pub fn lookup(&self, token: &str) -> Option<CanonicalType> {
        let normalized = normalize_token(token);
        if let Some(ty) = self.entries.get(&normalized) {
            return Some(*ty);
        }
        let base = strip_modifiers(&normalized);
        self.entries.get(&base).copied()
    }

    /// Resolve the canonical type of a column, failing on unmapped tokens
    pub fn resolve(&self, table: &str, column: &str, token: &str) -> Result<CanonicalType> {
        self.lookup(token).ok_or_else(|| Error::UnmappedType {
            backend: self.backend,
            table: table.to_string(),
            column: column.to_string(),
            type_token: token.to_string(),
        })
    }
}

/// Lowercase and collapse whitespace
fn normalize_token(token: &str) -> String {
    token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop parenthesized modifiers and MySQL attribute suffixes
///
/// Parentheses inside quoted enum/set members do not count.
fn strip_modifiers(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in token.chars() {
        match (quote, c) {
            // a doubled quote closes and reopens, which nets out
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 => out.push(c),
            (None, _) => {}
        }
    }
    out.split_whitespace()
        .filter(|word| !matches!(*word, "unsigned" | "signed" | "zerofill"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_lookup() {
        let table = TypeMappingTable::for_backend(Backend::Sqlite).unwrap();
        assert_eq!(table.lookup("INTEGER"), Some(T::Integer));
        assert_eq!(table.lookup("TEXT"), Some(T::String));
        assert_eq!(table.lookup("VARCHAR(255)"), Some(T::String));
        assert_eq!(table.lookup("  Double   Precision "), Some(T::Float));
        assert_eq!(table.lookup("NUMERIC(10, 2)"), Some(T::Decimal));
        assert_eq!(table.lookup("BLOB"), Some(T::Binary));
        assert_eq!(table.lookup("GEOMETRY"), None);
        assert_eq!(table.lookup(""), None);
    }

    #[test]
    fn test_postgres_lookup() {
        let table = TypeMappingTable::for_backend(Backend::Postgres).unwrap();
        assert_eq!(table.lookup("character varying"), Some(T::String));
        assert_eq!(table.lookup("timestamp(6) without time zone"), Some(T::DateTime));
        assert_eq!(table.lookup("int4"), Some(T::Integer));
        assert_eq!(table.lookup("jsonb"), None);
        assert_eq!(table.lookup("uuid"), None);
    }

    #[test]
    fn test_mysql_modifiers() {
        let table = TypeMappingTable::for_backend(Backend::MySql2).unwrap();
        assert_eq!(table.lookup("tinyint(1)"), Some(T::Boolean));
        assert_eq!(table.lookup("tinyint(4)"), Some(T::Integer));
        assert_eq!(table.lookup("int(10) unsigned"), Some(T::Integer));
        assert_eq!(table.lookup("decimal(12,4)"), Some(T::Decimal));
    }

    #[test]
    fn test_mysql_enum_members_with_parens() {
        let table = TypeMappingTable::mysql();
        assert_eq!(table.lookup("enum('a)','b')"), Some(T::String));
        assert_eq!(table.lookup("set('(x','it''s)')"), Some(T::String));
        assert_eq!(strip_modifiers("enum('a)','b') not null"), "enum not null");
        assert!(table.resolve("t", "c", "enum('a)','b')").is_ok());
    }

    #[test]
    fn test_shared_tables() {
        let a = TypeMappingTable::for_backend(Backend::Sqlite).unwrap();
        let b = TypeMappingTable::for_backend(Backend::Sqlite).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(TypeMappingTable::for_backend(Backend::Oracle).is_none());
    }

    #[test]
    fn test_resolve_unmapped() {
        let table = TypeMappingTable::for_backend(Backend::Sqlite).unwrap();
        let err = table.resolve("shapes", "outline", "POLYGON").unwrap_err();
        match err {
            Error::UnmappedType {
                backend,
                table,
                column,
                type_token,
            } => {
                assert_eq!(backend, Backend::Sqlite);
                assert_eq!(table, "shapes");
                assert_eq!(column, "outline");
                assert_eq!(type_token, "POLYGON");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_table() {
        let table = TypeMappingTable::new(
            Backend::Oracle,
            [("NUMBER", T::Decimal), ("VARCHAR2", T::String)],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("varchar2(30)"), Some(T::String));
        assert_eq!(table.backend(), Backend::Oracle);
    }
}
