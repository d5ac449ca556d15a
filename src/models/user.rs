use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::glycemic::{GlycemicRanges, GlycemicTargets};

/// A patient or doctor account.
///
/// Doctors read the records of the patients they were granted; patients read
/// only their own. Glycemic parameters are set by doctors and fall back to the
/// process-wide defaults when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: Option<NaiveDate>,
    pub is_doctor: bool,
    pub glycemic_ranges: Option<GlycemicRanges>,
    pub glycemic_targets: Option<GlycemicTargets>,
    pub extra_data: Option<ExtraData>,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Age in whole years on `today`.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.birthdate.and_then(|born| today.years_since(born))
    }
}

/// Single-time measurements a patient reports outside the reading streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    #[serde(rename = "HbA1c")]
    pub hba1c: Option<f64>,
    pub weight: Option<f64>,
    pub blood_pressure: Option<f64>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A user as listed for a viewer: parameters resolved, birthdate turned into an age.
#[derive(Debug, Clone, Serialize)]
pub struct ViewableUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<u32>,
    pub glycemic_ranges: GlycemicRanges,
    pub glycemic_targets: GlycemicTargets,
    pub extra_data: Option<ExtraData>,
}
