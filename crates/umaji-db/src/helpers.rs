//! Row parsing helpers.
//!
//! Store columns are TEXT, but the master feed is produced by other tools and
//! may hold integers where we expect codes. These helpers isolate both the
//! nullable-text handling and the datetime dual-format issue (`SQLite`'s
//! `datetime('now')` vs Rust's `to_rfc3339()`).

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2025-09-28T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2025-09-28 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
/// You must use `get::<Option<String>>()` for nullable columns.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read any column as text, whatever its storage class.
///
/// Integers print in decimal; integral reals drop their `.0`; blobs are
/// rejected.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for BLOB columns or a failed read.
pub fn get_text_lenient(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get_value(idx)? {
        libsql::Value::Null => Ok(None),
        libsql::Value::Integer(i) => Ok(Some(i.to_string())),
        #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
        libsql::Value::Real(f) => Ok(Some(if f.fract() == 0.0 {
            (f as i64).to_string()
        } else {
            f.to_string()
        })),
        libsql::Value::Text(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        libsql::Value::Blob(_) => Err(DatabaseError::Query(format!(
            "column {idx} holds a BLOB where text was expected"
        ))),
    }
}

/// Count rows from a `SELECT COUNT(*) ...` result.
///
/// # Errors
///
/// Returns `DatabaseError::NoResult` when the query yields no row.
pub async fn read_count(mut rows: libsql::Rows) -> Result<u64, DatabaseError> {
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    let count = row.get::<i64>(0)?;
    u64::try_from(count).map_err(|_| DatabaseError::InvalidState(format!("negative count {count}")))
}
