//! Connection URI scheme normalization
//!
//! Maps raw URI schemes onto canonical backend identifiers:
//! - Alias folding (`sqlite3` → `sqlite`, `postgresql` → `postgres`)
//! - Alternate connectivity prefixing (`jdbc:`) for runtimes that reach
//!   databases through a bridging driver layer
//! - File-backed detection for embedded databases
//!
//! Everything here is pure. Unknown schemes pass through `normalize_scheme`
//! verbatim; only `SchemeDescriptor::parse` rejects them.

use std::fmt;

use crate::error::{Error, Result};

/// Prefix marking that a backend must be reached through the alternate
/// connectivity layer
pub const ALTERNATE_CONNECTIVITY_PREFIX: &str = "jdbc:";

/// Schemes accepted in connection URIs (pre-normalization)
pub const SUPPORTED_SCHEMES: &[&str] = &[
    "ado",
    "amalgalite",
    "cubrid",
    "db2",
    "dbi",
    "do",
    "fdbsql",
    "firebird",
    "ibmdb",
    "informix",
    "jdbc",
    "mysql",
    "mysql2",
    "odbc",
    "openbase",
    "oracle",
    "postgres",
    "postgresql",
    "sqlanywhere",
    "sqlite",
    "sqlite3",
    "swift",
    "tinytds",
];

/// Normalize a raw URI scheme into the canonical backend identifier.
///
/// `runtime_is_alternate` selects the alternate connectivity layer; every
/// backend except PostgreSQL is then prefixed with
/// [`ALTERNATE_CONNECTIVITY_PREFIX`].
///
/// # Examples
///
/// ```
/// use rivven_sql_adapter::scheme::normalize_scheme;
///
/// assert_eq!(normalize_scheme("sqlite3", false), "sqlite");
/// assert_eq!(normalize_scheme("postgresql", false), "postgres");
/// assert_eq!(normalize_scheme("mysql", false), "mysql");
/// assert_eq!(normalize_scheme("mysql", true), "jdbc:mysql");
/// assert_eq!(normalize_scheme("postgresql", true), "postgres");
/// ```
pub fn normalize_scheme(scheme: &str, runtime_is_alternate: bool) -> String {
    let normalized = match scheme {
        "sqlite3" => "sqlite",
        "postgresql" => "postgres",
        other => other,
    };

    if runtime_is_alternate && normalized != "postgres" {
        format!("{}{}", ALTERNATE_CONNECTIVITY_PREFIX, normalized)
    } else {
        normalized.to_string()
    }
}

/// Whether the scheme names an embedded, single-file database.
///
/// Works on both raw and normalized schemes.
#[inline]
pub fn is_database_file(scheme: &str) -> bool {
    scheme.contains("sqlite")
}

/// Whether the raw scheme is in [`SUPPORTED_SCHEMES`]
#[inline]
pub fn is_supported_scheme(scheme: &str) -> bool {
    SUPPORTED_SCHEMES.contains(&scheme)
}

/// Extract the scheme portion (text before the first `:`) of a connection URI
pub fn scheme_of(uri: &str) -> Result<&str> {
    match uri.split_once(':') {
        Some((scheme, _)) if !scheme.is_empty() => Ok(scheme),
        _ => Err(Error::config(format!(
            "connection URI has no scheme: '{}'",
            redact_uri(uri)
        ))),
    }
}

/// Replace the scheme of a connection URI
pub(crate) fn replace_scheme(uri: &str, scheme: &str) -> String {
    match uri.split_once(':') {
        Some((_, rest)) => format!("{}:{}", scheme, rest),
        None => uri.to_string(),
    }
}

/// Mask the password of a URI for logs and error messages
pub(crate) fn redact_uri(uri: &str) -> String {
    match url::Url::parse(uri) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => uri.to_string(),
    }
}

/// Canonical backend identifier (post-normalization)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// ActiveX Data Objects
    Ado,
    /// Amalgalite (embedded SQLite binding)
    Amalgalite,
    /// CUBRID
    Cubrid,
    /// IBM DB2
    Db2,
    /// DBI bridge
    Dbi,
    /// DataObjects bridge
    DataObjects,
    /// FoundationDB SQL layer
    FdbSql,
    /// Firebird
    Firebird,
    /// IBM DB (ibm_db driver)
    IbmDb,
    /// Informix
    Informix,
    /// Alternate connectivity layer (JDBC)
    Jdbc,
    /// MySQL/MariaDB
    MySql,
    /// MySQL/MariaDB via the mysql2 driver
    MySql2,
    /// ODBC bridge
    Odbc,
    /// OpenBase
    OpenBase,
    /// Oracle
    Oracle,
    /// PostgreSQL
    Postgres,
    /// SQL Anywhere
    SqlAnywhere,
    /// SQLite
    Sqlite,
    /// Swift bridge
    Swift,
    /// SQL Server via TinyTDS
    TinyTds,
}

impl Backend {
    /// Resolve a normalized scheme to a backend
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        let backend = match scheme {
            "ado" => Self::Ado,
            "amalgalite" => Self::Amalgalite,
            "cubrid" => Self::Cubrid,
            "db2" => Self::Db2,
            "dbi" => Self::Dbi,
            "do" => Self::DataObjects,
            "fdbsql" => Self::FdbSql,
            "firebird" => Self::Firebird,
            "ibmdb" => Self::IbmDb,
            "informix" => Self::Informix,
            "jdbc" => Self::Jdbc,
            "mysql" => Self::MySql,
            "mysql2" => Self::MySql2,
            "odbc" => Self::Odbc,
            "openbase" => Self::OpenBase,
            "oracle" => Self::Oracle,
            "postgres" => Self::Postgres,
            "sqlanywhere" => Self::SqlAnywhere,
            "sqlite" => Self::Sqlite,
            "swift" => Self::Swift,
            "tinytds" => Self::TinyTds,
            _ => return None,
        };
        Some(backend)
    }

    /// Canonical scheme string
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Ado => "ado",
            Self::Amalgalite => "amalgalite",
            Self::Cubrid => "cubrid",
            Self::Db2 => "db2",
            Self::Dbi => "dbi",
            Self::DataObjects => "do",
            Self::FdbSql => "fdbsql",
            Self::Firebird => "firebird",
            Self::IbmDb => "ibmdb",
            Self::Informix => "informix",
            Self::Jdbc => "jdbc",
            Self::MySql => "mysql",
            Self::MySql2 => "mysql2",
            Self::Odbc => "odbc",
            Self::OpenBase => "openbase",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
            Self::SqlAnywhere => "sqlanywhere",
            Self::Sqlite => "sqlite",
            Self::Swift => "swift",
            Self::TinyTds => "tinytds",
        }
    }

    /// Whether this backend speaks the MySQL wire protocol
    #[inline]
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Self::MySql | Self::MySql2)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Immutable description of a connection scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeDescriptor {
    /// Canonical backend
    pub backend: Backend,
    /// Normalized scheme, including any connectivity prefix
    pub scheme: String,
    /// Backend reached through the alternate connectivity layer, if any
    pub subprotocol: Option<String>,
    /// Whether the backend is an embedded, single-file database
    pub is_file_backed: bool,
}

impl SchemeDescriptor {
    /// Describe a raw scheme
    ///
    /// Fails with [`Error::UnsupportedScheme`] if the normalized scheme does
    /// not name a known backend.
    pub fn parse(raw: &str, runtime_is_alternate: bool) -> Result<Self> {
        let scheme = normalize_scheme(raw, runtime_is_alternate);

        let (backend, subprotocol) = match scheme.strip_prefix(ALTERNATE_CONNECTIVITY_PREFIX) {
            Some(sub) if !sub.is_empty() => (Some(Backend::Jdbc), Some(sub.to_string())),
            _ => (Backend::from_scheme(&scheme), None),
        };

        let backend = backend.ok_or_else(|| Error::unsupported_scheme(&scheme))?;

        Ok(Self {
            backend,
            scheme,
            subprotocol,
            is_file_backed: is_database_file(raw),
        })
    }

    /// Describe the scheme of a connection URI
    pub fn from_uri(uri: &str, runtime_is_alternate: bool) -> Result<Self> {
        Self::parse(scheme_of(uri)?, runtime_is_alternate)
    }
}
