//! Reading uploads and windowed reading queries.
//!
//! Timestamps cross this boundary as unix seconds and are stored as local
//! naive time, the same clock the summary slots are computed on.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::check_viewable;
use crate::db;
use crate::error::ServiceError;
use crate::models::{ReadingPoint, Sample, SampleKind, User};

/// Which readings to return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingWindow {
    /// The trailing `n` days up to now.
    LastDays(u32),
    /// Calendar days `start..=end`. Without `end`, everything from `start` on.
    Dates { start: NaiveDate, end: Option<NaiveDate> },
}

impl ReadingWindow {
    /// `[from, to)` of the window. A day count reaching past the calendar
    /// is invalid input.
    fn bounds(
        &self,
        now: NaiveDateTime,
    ) -> Result<(NaiveDateTime, Option<NaiveDateTime>), ServiceError> {
        match *self {
            ReadingWindow::LastDays(days) => {
                let from = Duration::try_days(i64::from(days))
                    .and_then(|span| now.checked_sub_signed(span))
                    .ok_or_else(|| ServiceError::InvalidInput("Invalid ndays".into()))?;
                Ok((from, None))
            }
            ReadingWindow::Dates { start, end } => Ok((
                start.and_time(chrono::NaiveTime::MIN),
                end.and_then(|d| d.succ_opt()).map(|d| d.and_time(chrono::NaiveTime::MIN)),
            )),
        }
    }
}

pub fn local_from_unix(timestamp: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

pub fn unix_from_local(local: &NaiveDateTime) -> i64 {
    match Local.from_local_datetime(local).earliest() {
        Some(dt) => dt.timestamp(),
        // Inside a DST gap; read the wall clock as UTC.
        None => local.and_utc().timestamp(),
    }
}

/// Resolve requested stream names. Unknown names are ignored; nothing
/// requested (or nothing recognised) means every stream.
pub fn parse_kinds(requested: Option<&[String]>) -> Vec<SampleKind> {
    let mut kinds: Vec<SampleKind> = requested
        .unwrap_or_default()
        .iter()
        .filter_map(|name| SampleKind::from_str(name.trim()).ok())
        .collect();
    kinds.sort();
    kinds.dedup();
    if kinds.is_empty() {
        SampleKind::ALL.to_vec()
    } else {
        kinds
    }
}

/// Store one reading for the calling patient.
pub fn add_reading(
    conn: &Connection,
    actor: &User,
    kind: &str,
    value: f64,
    timestamp: i64,
) -> Result<Sample, ServiceError> {
    if actor.is_doctor {
        return Err(ServiceError::Forbidden("Only patients can upload data".into()));
    }
    let kind = SampleKind::from_str(kind)
        .map_err(|_| ServiceError::InvalidInput("Invalid data type".into()))?;
    if !value.is_finite() {
        return Err(ServiceError::InvalidInput("Invalid value".into()));
    }
    let recorded_at = local_from_unix(timestamp)
        .ok_or_else(|| ServiceError::InvalidInput("Invalid timestamp".into()))?;

    let sample = Sample {
        patient_id: actor.id,
        kind,
        recorded_at,
        value,
    };
    db::insert_sample(conn, &sample)?;
    tracing::debug!(patient_id = %actor.id, kind = kind.as_str(), "Reading stored");
    Ok(sample)
}

/// Readings of `patient` (the caller when `None`) per stream, ascending.
pub fn get_readings(
    conn: &Connection,
    actor: &User,
    patient: Option<&Uuid>,
    kinds: Option<&[String]>,
    window: ReadingWindow,
    now: NaiveDateTime,
) -> Result<BTreeMap<SampleKind, Vec<ReadingPoint>>, ServiceError> {
    let patient_id = check_viewable(conn, actor, patient)?;
    let (from, to) = window.bounds(now)?;

    let mut out = BTreeMap::new();
    for kind in parse_kinds(kinds) {
        let points = db::get_samples_in_range(conn, &patient_id, kind, &from, to.as_ref())?
            .into_iter()
            .map(|s| ReadingPoint {
                t: unix_from_local(&s.recorded_at),
                v: s.value,
            })
            .collect();
        out.insert(kind, points);
    }
    Ok(out)
}
