//! Store seams used by the summary builder.
//!
//! - SampleStore: raw readings of a patient's stream
//! - SummaryCacheStore: one cached summary per patient, lazily expired
//! - PatientDirectory: patients a viewer may read, with their parameters
//!
//! The SQLite implementations delegate to `db::repository`.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{PatientGlycemicProfile, Sample, SampleKind, SummaryCache};

pub trait SampleStore: Send + Sync {
    /// Readings of one stream in `[from, to)`, ascending by time.
    fn query(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        kind: SampleKind,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<Vec<Sample>, DatabaseError>;
}

pub trait SummaryCacheStore: Send + Sync {
    fn get(&self, conn: &Connection, patient_id: &Uuid) -> Result<Option<SummaryCache>, DatabaseError>;

    /// Store a summary, replacing any existing one for the same patient.
    fn upsert(&self, conn: &Connection, summary: &SummaryCache) -> Result<(), DatabaseError>;

    /// Delete summaries whose ttl is before `now`. Returns how many went.
    fn purge_expired(&self, conn: &Connection, now: &NaiveDateTime) -> Result<u64, DatabaseError>;
}

pub trait PatientDirectory: Send + Sync {
    /// The viewer itself and every patient it may read, doctors excluded.
    fn list_viewable_patients(
        &self,
        conn: &Connection,
        viewer_id: &Uuid,
    ) -> Result<Vec<PatientGlycemicProfile>, DatabaseError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSampleStore;

impl SampleStore for SqliteSampleStore {
    fn query(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        kind: SampleKind,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<Vec<Sample>, DatabaseError> {
        db::get_samples_in_range(conn, patient_id, kind, from, Some(to))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSummaryCacheStore;

impl SummaryCacheStore for SqliteSummaryCacheStore {
    fn get(&self, conn: &Connection, patient_id: &Uuid) -> Result<Option<SummaryCache>, DatabaseError> {
        db::get_summary(conn, patient_id)
    }

    fn upsert(&self, conn: &Connection, summary: &SummaryCache) -> Result<(), DatabaseError> {
        db::upsert_summary(conn, summary)
    }

    fn purge_expired(&self, conn: &Connection, now: &NaiveDateTime) -> Result<u64, DatabaseError> {
        db::delete_expired_summaries(conn, now)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlitePatientDirectory;

impl PatientDirectory for SqlitePatientDirectory {
    fn list_viewable_patients(
        &self,
        conn: &Connection,
        viewer_id: &Uuid,
    ) -> Result<Vec<PatientGlycemicProfile>, DatabaseError> {
        Ok(db::list_viewable_users(conn, viewer_id)?
            .into_iter()
            .map(|user| PatientGlycemicProfile {
                patient_id: user.id,
                ranges: user.glycemic_ranges,
                targets: user.glycemic_targets,
            })
            .collect())
    }
}
