//! Guards for values spliced into SQL text.
//!
//! SQLite's `PRAGMA journal_mode = ...` takes its argument as a bare word
//! and cannot bind a parameter, so the value is checked here first.

use crate::error::{Error, Result};

/// Longest bare word accepted by [`validate_sql_identifier`].
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Check that `word` is a plain SQL word: `[A-Za-z_][A-Za-z0-9_]*`, at most
/// [`MAX_IDENTIFIER_LEN`] bytes.
///
/// ```
/// use rivven_sql_adapter::security::validate_sql_identifier;
///
/// assert!(validate_sql_identifier("WAL").is_ok());
/// assert!(validate_sql_identifier("users_2024").is_ok());
/// assert!(validate_sql_identifier("wal; DROP TABLE users--").is_err());
/// assert!(validate_sql_identifier("9lives").is_err());
/// ```
pub fn validate_sql_identifier(word: &str) -> Result<()> {
    if word.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::config(format!(
            "identifier is {} bytes long, limit is {MAX_IDENTIFIER_LEN}",
            word.len()
        )));
    }

    let Some(first) = word.chars().next() else {
        return Err(Error::config("identifier is empty"));
    };
    if first.is_ascii_digit() {
        return Err(Error::config(format!(
            "identifier {word:?} starts with a digit"
        )));
    }

    match word
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        Some(bad) => Err(Error::config(format!(
            "identifier {word:?} contains {bad:?}"
        ))),
        None => Ok(()),
    }
}
