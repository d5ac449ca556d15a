use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub medicine: Vec<String>,
    pub created_at: NaiveDateTime,
}
