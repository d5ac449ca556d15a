use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{datetime_column, format_datetime, map_row_error, uuid_column};
use crate::db::DatabaseError;
use crate::models::{Sample, SampleKind};

/// Append a reading to a patient's stream.
pub fn insert_sample(conn: &Connection, sample: &Sample) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO samples (patient_id, kind, recorded_at, value) VALUES (?1, ?2, ?3, ?4)",
        params![
            sample.patient_id.to_string(),
            sample.kind.as_str(),
            format_datetime(&sample.recorded_at),
            sample.value,
        ],
    )?;
    Ok(())
}

/// Readings of one stream in `[from, to)`, ordered by recorded_at ascending.
/// Without `to` the range is open-ended.
pub fn get_samples_in_range(
    conn: &Connection,
    patient_id: &Uuid,
    kind: SampleKind,
    from: &NaiveDateTime,
    to: Option<&NaiveDateTime>,
) -> Result<Vec<Sample>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, kind, recorded_at, value
         FROM samples
         WHERE patient_id = ?1 AND kind = ?2
           AND recorded_at >= ?3 AND (?4 IS NULL OR recorded_at < ?4)
         ORDER BY recorded_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(
        params![
            patient_id.to_string(),
            kind.as_str(),
            format_datetime(from),
            to.map(format_datetime),
        ],
        row_to_sample,
    )?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_row_error)
}

fn row_to_sample(row: &rusqlite::Row) -> Result<Sample, rusqlite::Error> {
    let kind_str: String = row.get(1)?;

    Ok(Sample {
        patient_id: uuid_column(row, 0)?,
        kind: SampleKind::from_str(&kind_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        recorded_at: datetime_column(row, 2)?,
        value: row.get(3)?,
    })
}
