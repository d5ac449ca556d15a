//! Repository layer: table-scoped database operations.
//!
//! Each sub-module owns the SQL for one table. All public functions are
//! re-exported here.

mod diagnosis;
mod note;
mod sample;
mod summary_cache;
mod user;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DATETIME_FORMAT;

pub use diagnosis::*;
pub use note::*;
pub use sample::*;
pub use summary_cache::*;
pub use user::*;

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn uuid_column(row: &rusqlite::Row, idx: usize) -> Result<Uuid, rusqlite::Error> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn datetime_column(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<NaiveDateTime, rusqlite::Error> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Decode a JSON TEXT column, `None` when NULL.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<Option<T>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// JSON columns that fail to decode surface as constraint violations:
/// the write path is responsible for storing well-formed arrays.
pub(crate) fn map_row_error(e: rusqlite::Error) -> super::DatabaseError {
    match e {
        rusqlite::Error::FromSqlConversionFailure(idx, _, inner) => {
            super::DatabaseError::ConstraintViolation(format!("column {idx}: {inner}"))
        }
        other => super::DatabaseError::Sqlite(other),
    }
}
