//! Value and metadata types for rivven-sql-adapter
//!
//! - `Value` / `Row`: driver-neutral values exchanged with datasets
//! - `ColumnMetadata` / `TableMetadata`: raw backend catalog information
//! - `CanonicalType` / `ColumnDescriptor`: backend-independent attribute
//!   description handed to the relation-mapping layer

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single cell, independent of the driver that produced it
///
/// Drivers widen on read: SQLite and MySQL hand back `Int64` for every
/// integer column, while PostgreSQL keeps the declared width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL
    Null,
    /// Boolean
    Bool(bool),
    /// SMALLINT
    Int16(i16),
    /// INTEGER
    Int32(i32),
    /// BIGINT, and every SQLite/MySQL integer
    Int64(i64),
    /// REAL
    Float32(f32),
    /// DOUBLE
    Float64(f64),
    /// NUMERIC / DECIMAL
    Decimal(Decimal),
    /// Character data
    String(String),
    /// BLOB / BYTEA
    Bytes(Vec<u8>),
    /// DATE
    Date(NaiveDate),
    /// TIME
    Time(NaiveTime),
    /// TIMESTAMP without zone
    DateTime(NaiveDateTime),
    /// TIMESTAMP with zone, normalized to UTC
    DateTimeTz(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON document
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is SQL NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interpret as a flag
    ///
    /// Catalogs disagree on how they report booleans: PostgreSQL sends
    /// `bool`, SQLite and MySQL send 0/1, option maps send text.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int16(_) | Self::Int32(_) | Self::Int64(_) => self.as_i64().map(|n| n != 0),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Interpret as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(n) => Some(i64::from(*n)),
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            Self::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Textual rendering of scalar values; `None` for NULL and structured values
    pub fn as_string(&self) -> Option<String> {
        let text = match self {
            Self::String(s) => s.clone(),
            Self::Bytes(b) => return String::from_utf8(b.clone()).ok(),
            Self::Bool(b) => b.to_string(),
            Self::Int16(n) => n.to_string(),
            Self::Int32(n) => n.to_string(),
            Self::Int64(n) => n.to_string(),
            Self::Float32(n) => n.to_string(),
            Self::Float64(n) => n.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Uuid(u) => u.to_string(),
            Self::Null
            | Self::Date(_)
            | Self::Time(_)
            | Self::DateTime(_)
            | Self::DateTimeTz(_)
            | Self::Json(_) => return None,
        };
        Some(text)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => DateTimeTz,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One result row: column names paired positionally with values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Pair column names with values; both must have the same length
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Number of columns
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column names, in result order
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values, in result order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at a position
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value of a named column
    ///
    /// An exact match wins; otherwise the first ASCII case-insensitive
    /// match is used, since backends disagree on identifier folding.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))?;
        self.values.get(idx)
    }

    /// `(column, value)` pairs in result order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(&self.values)
    }
}

/// Raw column metadata as reported by the backend catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Backend-native type token (e.g. `VARCHAR(255)`, `int4`)
    pub type_name: String,
    /// Whether column is nullable
    pub nullable: bool,
    /// Position within the primary key (1-based), `None` outside it
    pub primary_key_ordinal: Option<u32>,
    /// Declaration position (1-based)
    pub ordinal: u32,
    /// Default expression as the catalog renders it
    pub default_value: Option<String>,
}

impl ColumnMetadata {
    /// Nullable, non-key column with no default
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            primary_key_ordinal: None,
            ordinal: 0,
            default_value: None,
        }
    }

    /// Whether the column belongs to the primary key
    #[inline]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key_ordinal.is_some()
    }
}

/// Catalog view of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    /// Table with no columns yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Column by name, ASCII case-insensitive
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary key column names in key order
    pub fn primary_key(&self) -> Vec<&str> {
        let mut keyed: Vec<_> = self
            .columns
            .iter()
            .filter_map(|c| c.primary_key_ordinal.map(|ord| (ord, c.name.as_str())))
            .collect();
        keyed.sort_unstable_by_key(|(ord, _)| *ord);
        keyed.into_iter().map(|(_, name)| name).collect()
    }
}

/// Backend-independent column type vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    /// Whole numbers
    Integer,
    /// Binary floating point
    Float,
    /// Exact numeric
    Decimal,
    /// Character data
    String,
    /// True/false
    Boolean,
    /// Calendar date
    Date,
    /// Date and time of day
    DateTime,
    /// Time of day
    Time,
    /// Opaque bytes
    Binary,
}

impl CanonicalType {
    /// Lowercase name of the type
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column name paired with its canonical type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Canonical type
    #[serde(rename = "type")]
    pub canonical_type: CanonicalType,
}

impl ColumnDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, canonical_type: CanonicalType) -> Self {
        Self {
            name: name.into(),
            canonical_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_flags() {
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert_eq!(Value::Int64(1).as_bool(), Some(true));
        assert_eq!(Value::Int32(0).as_bool(), Some(false));
        assert_eq!(Value::String(" On ".into()).as_bool(), Some(true));
        assert_eq!(Value::String("maybe".into()).as_bool(), None);
        assert_eq!(Value::Null.as_bool(), None);
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(Value::Int16(-3).as_i64(), Some(-3));
        assert_eq!(Value::String("42".into()).as_i64(), Some(42));
        assert_eq!(Value::Decimal(Decimal::new(7, 0)).as_i64(), Some(7));
        assert_eq!(Value::Decimal(Decimal::new(75, 1)).as_i64(), None);
        assert_eq!(Value::Float64(1.0).as_i64(), None);
    }

    #[test]
    fn test_as_string() {
        assert_eq!(Value::Int32(5).as_string().as_deref(), Some("5"));
        assert_eq!(Value::Bytes(b"abc".to_vec()).as_string().as_deref(), Some("abc"));
        assert_eq!(Value::Bytes(vec![0xff]).as_string(), None);
        assert_eq!(Value::Null.as_string(), None);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(42_i64), Value::Int64(42));
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }

    #[test]
    fn test_row_lookup() {
        let row = Row::new(
            vec!["id".into(), "Name".into(), "name".into()],
            vec![Value::Int64(1), "upper".into(), "lower".into()],
        );

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_by_name("name"), Some(&Value::String("lower".into())));
        assert_eq!(row.get_by_name("NAME"), Some(&Value::String("upper".into())));
        assert_eq!(row.get_by_name("missing"), None);

        let pairs: Vec<_> = row.iter().map(|(c, _)| c).collect();
        assert_eq!(pairs, vec!["id", "Name", "name"]);
    }

    #[test]
    fn test_table_metadata() {
        let mut table = TableMetadata::new("memberships");
        let mut user = ColumnMetadata::new("user_id", "INTEGER");
        user.primary_key_ordinal = Some(2);
        let mut group = ColumnMetadata::new("group_id", "INTEGER");
        group.primary_key_ordinal = Some(1);
        table.columns.push(user);
        table.columns.push(group);
        table.columns.push(ColumnMetadata::new("role", "TEXT"));

        assert_eq!(table.column_names(), vec!["user_id", "group_id", "role"]);
        assert_eq!(table.primary_key(), vec!["group_id", "user_id"]);
        assert!(table.column("ROLE").is_some());
    }

    #[test]
    fn test_canonical_type_serde() {
        let descriptor = ColumnDescriptor::new("created_at", CanonicalType::DateTime);
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"name":"created_at","type":"datetime"}"#);
        assert_eq!(CanonicalType::DateTime.to_string(), "datetime");
    }
}
