//! Diagnoses on a patient's record. Anyone with view access reads them;
//! only doctors with view access write them.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::{check_viewable, require_doctor};
use crate::db;
use crate::error::ServiceError;
use crate::models::{Diagnosis, User};

const DOCTORS_ONLY: &str = "Only doctors can manage diagnoses";

fn clean_medicine(medicine: Vec<String>) -> Vec<String> {
    medicine
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// Load a diagnosis and check the actor may write to its patient.
fn load_for_write(conn: &Connection, actor: &User, id: &Uuid) -> Result<Diagnosis, ServiceError> {
    require_doctor(actor, DOCTORS_ONLY)?;
    let diagnosis = db::get_diagnosis(conn, id)?
        .ok_or_else(|| ServiceError::NotFound("Invalid diagnosis".into()))?;
    check_viewable(conn, actor, Some(&diagnosis.patient_id))?;
    Ok(diagnosis)
}

pub fn list(
    conn: &Connection,
    actor: &User,
    patient: Option<&Uuid>,
) -> Result<Vec<Diagnosis>, ServiceError> {
    let patient_id = check_viewable(conn, actor, patient)?;
    Ok(db::get_diagnoses_for_patient(conn, &patient_id)?)
}

pub fn add(
    conn: &Connection,
    actor: &User,
    patient_id: &Uuid,
    name: &str,
    medicine: Vec<String>,
    now: NaiveDateTime,
) -> Result<Diagnosis, ServiceError> {
    require_doctor(actor, DOCTORS_ONLY)?;
    let patient_id = check_viewable(conn, actor, Some(patient_id))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Missing diagnosis name".into()));
    }

    let diagnosis = Diagnosis {
        id: Uuid::new_v4(),
        patient_id,
        name: name.to_string(),
        medicine: clean_medicine(medicine),
        created_at: now,
    };
    db::insert_diagnosis(conn, &diagnosis)?;
    tracing::info!(diagnosis_id = %diagnosis.id, patient_id = %patient_id, "Diagnosis added");
    Ok(diagnosis)
}

/// Change name and/or medicine. Blank names are ignored.
pub fn update(
    conn: &Connection,
    actor: &User,
    id: &Uuid,
    name: Option<&str>,
    medicine: Option<Vec<String>>,
) -> Result<Diagnosis, ServiceError> {
    load_for_write(conn, actor, id)?;
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let medicine = medicine.map(clean_medicine);
    db::update_diagnosis(conn, id, name, medicine.as_deref())?;
    db::get_diagnosis(conn, id)?.ok_or_else(|| ServiceError::NotFound("Invalid diagnosis".into()))
}

pub fn delete(conn: &Connection, actor: &User, id: &Uuid) -> Result<(), ServiceError> {
    let diagnosis = load_for_write(conn, actor, id)?;
    db::delete_diagnosis(conn, id)?;
    tracing::info!(diagnosis_id = %id, patient_id = %diagnosis.patient_id, "Diagnosis deleted");
    Ok(())
}
