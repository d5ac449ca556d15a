use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::glycemic::{GlycemicRanges, GlycemicTargets, BAND_COUNT};

/// Fifteen-minute slots in a day.
pub const SLOTS_PER_DAY: usize = 96;

/// Cached glycemic summary for one patient.
///
/// Replaced wholesale on recomputation; a row is live while `ttl >= now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryCache {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Mean value per time-of-day slot, `None` where no reading fell.
    pub time_of_day: Vec<Option<f64>>,
    /// Fraction of the window spent in each band.
    pub distribution: [f64; BAND_COUNT],
    /// Indices of the targets the distribution violates.
    pub problems: BTreeSet<usize>,
    pub ttl: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl SummaryCache {
    pub fn is_live(&self, now: &NaiveDateTime) -> bool {
        self.ttl >= *now
    }
}

/// Patient entry as handed to the summary builder by the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientGlycemicProfile {
    pub patient_id: Uuid,
    pub ranges: Option<GlycemicRanges>,
    pub targets: Option<GlycemicTargets>,
}
