use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{datetime_column, format_datetime, json_column, map_row_error, uuid_column};
use crate::db::DatabaseError;
use crate::models::Diagnosis;

pub fn insert_diagnosis(conn: &Connection, diag: &Diagnosis) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO diagnoses (id, patient_id, name, medicine, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            diag.id.to_string(),
            diag.patient_id.to_string(),
            diag.name,
            serde_json::to_string(&diag.medicine)?,
            format_datetime(&diag.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_diagnosis(conn: &Connection, id: &Uuid) -> Result<Option<Diagnosis>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, name, medicine, created_at FROM diagnoses WHERE id = ?1",
        params![id.to_string()],
        row_to_diagnosis,
    )
    .optional()
    .map_err(map_row_error)
}

pub fn get_diagnoses_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Diagnosis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, medicine, created_at
         FROM diagnoses
         WHERE patient_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], row_to_diagnosis)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_row_error)
}

/// Update name and/or medicine list. `None` keeps the stored value.
pub fn update_diagnosis(
    conn: &Connection,
    id: &Uuid,
    name: Option<&str>,
    medicine: Option<&[String]>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE diagnoses SET
            name = COALESCE(?2, name),
            medicine = COALESCE(?3, medicine)
         WHERE id = ?1",
        params![
            id.to_string(),
            name,
            medicine.map(serde_json::to_string).transpose()?,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "diagnosis".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_diagnosis(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM diagnoses WHERE id = ?1",
        params![id.to_string()],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "diagnosis".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_diagnosis(row: &rusqlite::Row) -> Result<Diagnosis, rusqlite::Error> {
    Ok(Diagnosis {
        id: uuid_column(row, 0)?,
        patient_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        medicine: json_column(row, 3)?.unwrap_or_default(),
        created_at: datetime_column(row, 4)?,
    })
}
