use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-text note on a patient's record. Private notes are visible to doctors only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub writer_id: Uuid,
    pub text: String,
    pub private: bool,
    pub written_at: NaiveDateTime,
}
