//! Notes on a patient's record.
//!
//! Doctors see private notes, patients do not. Anyone with view access may
//! write a note; edits and deletion belong to doctors and the note's writer.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::check_viewable;
use crate::db;
use crate::error::ServiceError;
use crate::models::{Note, User};

fn load_for_write(conn: &Connection, actor: &User, id: &Uuid) -> Result<Note, ServiceError> {
    let note = db::get_note(conn, id)?
        .ok_or_else(|| ServiceError::NotFound("Invalid note".into()))?;
    check_viewable(conn, actor, Some(&note.patient_id))?;
    if !actor.is_doctor && note.writer_id != actor.id {
        return Err(ServiceError::Forbidden("Can only modify your own notes".into()));
    }
    Ok(note)
}

pub fn list(conn: &Connection, actor: &User, patient: Option<&Uuid>) -> Result<Vec<Note>, ServiceError> {
    let patient_id = check_viewable(conn, actor, patient)?;
    Ok(db::get_notes_for_patient(conn, &patient_id, actor.is_doctor)?)
}

pub fn add(
    conn: &Connection,
    actor: &User,
    patient: Option<&Uuid>,
    text: &str,
    private: bool,
    now: NaiveDateTime,
) -> Result<Note, ServiceError> {
    let patient_id = check_viewable(conn, actor, patient)?;
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidInput("Missing note text".into()));
    }
    let note = Note {
        id: Uuid::new_v4(),
        patient_id,
        writer_id: actor.id,
        text: text.to_string(),
        private,
        written_at: now,
    };
    db::insert_note(conn, &note)?;
    tracing::debug!(note_id = %note.id, patient_id = %patient_id, "Note added");
    Ok(note)
}

/// Edit text and/or privacy. The private flag is ignored for non-doctors.
pub fn update(
    conn: &Connection,
    actor: &User,
    id: &Uuid,
    text: Option<&str>,
    private: Option<bool>,
) -> Result<Note, ServiceError> {
    load_for_write(conn, actor, id)?;
    let text = text.filter(|t| !t.trim().is_empty());
    let private = private.filter(|_| actor.is_doctor);
    db::update_note(conn, id, text, private)?;
    db::get_note(conn, id)?.ok_or_else(|| ServiceError::NotFound("Invalid note".into()))
}

pub fn delete(conn: &Connection, actor: &User, id: &Uuid) -> Result<(), ServiceError> {
    load_for_write(conn, actor, id)?;
    db::delete_note(conn, id)?;
    Ok(())
}
