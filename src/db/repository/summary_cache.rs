use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{datetime_column, format_datetime, json_column, map_row_error, uuid_column};
use crate::db::DatabaseError;
use crate::models::SummaryCache;

/// Insert or replace the cached summary of a patient.
///
/// `patient_id` is unique, so two writers racing on the same patient leave a
/// single row holding the last write.
pub fn upsert_summary(conn: &Connection, summary: &SummaryCache) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO summary_cache (id, patient_id, time_of_day, distribution, problems, ttl, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(patient_id) DO UPDATE SET
           id = excluded.id,
           time_of_day = excluded.time_of_day,
           distribution = excluded.distribution,
           problems = excluded.problems,
           ttl = excluded.ttl,
           created_at = excluded.created_at",
        params![
            summary.id.to_string(),
            summary.patient_id.to_string(),
            serde_json::to_string(&summary.time_of_day)?,
            serde_json::to_string(&summary.distribution)?,
            serde_json::to_string(&summary.problems)?,
            format_datetime(&summary.ttl),
            format_datetime(&summary.created_at),
        ],
    )?;
    Ok(())
}

/// Get the cached summary of a patient, expired or not.
pub fn get_summary(conn: &Connection, patient_id: &Uuid) -> Result<Option<SummaryCache>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, time_of_day, distribution, problems, ttl, created_at
         FROM summary_cache
         WHERE patient_id = ?1",
        params![patient_id.to_string()],
        row_to_summary,
    )
    .optional()
    .map_err(map_row_error)
}

/// Delete every summary whose ttl is before `now`.
pub fn delete_expired_summaries(conn: &Connection, now: &NaiveDateTime) -> Result<u64, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM summary_cache WHERE ttl < ?1",
        params![format_datetime(now)],
    )?;
    Ok(affected as u64)
}

/// Drop a patient's summary so the next read recomputes it.
pub fn delete_summary(conn: &Connection, patient_id: &Uuid) -> Result<u64, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM summary_cache WHERE patient_id = ?1",
        params![patient_id.to_string()],
    )?;
    Ok(affected as u64)
}

fn row_to_summary(row: &rusqlite::Row) -> Result<SummaryCache, rusqlite::Error> {
    let missing = |idx: usize| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Null,
            "empty JSON column".into(),
        )
    };

    Ok(SummaryCache {
        id: uuid_column(row, 0)?,
        patient_id: uuid_column(row, 1)?,
        time_of_day: json_column(row, 2)?.ok_or_else(|| missing(2))?,
        distribution: json_column(row, 3)?.ok_or_else(|| missing(3))?,
        problems: json_column(row, 4)?.ok_or_else(|| missing(4))?,
        ttl: datetime_column(row, 5)?,
        created_at: datetime_column(row, 6)?,
    })
}
