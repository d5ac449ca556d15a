//! Glycemic summary cache.
//!
//! Aggregates a patient's trailing CGM readings into:
//! - a 96-slot time-of-day mean (`time_of_day`)
//! - a time-weighted distribution over five glycemic bands (`distribution`)
//! - the set of targets that distribution violates (`problems`)
//!
//! Results are cached per patient with a ttl and swept lazily at the start of
//! every `get_summaries` call. No background task is involved.

pub mod builder;
pub mod distribution;
pub mod problems;
pub mod stores;
pub mod time_of_day;

pub use builder::{build_summary, SummaryBuilder};
pub use distribution::{classify, time_weighted_distribution};
pub use problems::evaluate_problems;
pub use stores::*;
pub use time_of_day::{slot_of, time_of_day_means};

use chrono::SubsecRound;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::SummaryCache;

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Summaries for `viewer_id` against the SQLite stores, at the local time.
pub fn get_summaries(conn: &Connection, viewer_id: &Uuid) -> Result<Vec<SummaryCache>, SummaryError> {
    let now = chrono::Local::now().naive_local().trunc_subsecs(0);
    SummaryBuilder::new(&SqliteSampleStore, &SqliteSummaryCacheStore, &SqlitePatientDirectory)
        .get_summaries(conn, viewer_id, now)
}
