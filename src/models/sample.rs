use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::SampleKind;

/// One reading on a patient's stream. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub patient_id: Uuid,
    pub kind: SampleKind,
    pub recorded_at: NaiveDateTime,
    pub value: f64,
}

/// Compact wire form of a reading: unix seconds and value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingPoint {
    pub t: i64,
    pub v: f64,
}
