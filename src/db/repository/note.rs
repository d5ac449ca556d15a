use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{datetime_column, format_datetime, map_row_error, uuid_column};
use crate::db::DatabaseError;
use crate::models::Note;

pub fn insert_note(conn: &Connection, note: &Note) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO notes (id, patient_id, writer_id, text, private, written_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            note.id.to_string(),
            note.patient_id.to_string(),
            note.writer_id.to_string(),
            note.text,
            note.private,
            format_datetime(&note.written_at),
        ],
    )?;
    Ok(())
}

pub fn get_note(conn: &Connection, id: &Uuid) -> Result<Option<Note>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, writer_id, text, private, written_at FROM notes WHERE id = ?1",
        params![id.to_string()],
        row_to_note,
    )
    .optional()
    .map_err(map_row_error)
}

/// Notes on a patient's record, oldest first. Private notes only when asked for.
pub fn get_notes_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
    include_private: bool,
) -> Result<Vec<Note>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, writer_id, text, private, written_at
         FROM notes
         WHERE patient_id = ?1 AND (?2 OR private = 0)
         ORDER BY written_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string(), include_private], row_to_note)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_row_error)
}

/// Update text and/or the private flag. `None` keeps the stored value.
pub fn update_note(
    conn: &Connection,
    id: &Uuid,
    text: Option<&str>,
    private: Option<bool>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE notes SET
            text = COALESCE(?2, text),
            private = COALESCE(?3, private)
         WHERE id = ?1",
        params![id.to_string(), text, private],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "note".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_note(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM notes WHERE id = ?1", params![id.to_string()])?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "note".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn row_to_note(row: &rusqlite::Row) -> Result<Note, rusqlite::Error> {
    Ok(Note {
        id: uuid_column(row, 0)?,
        patient_id: uuid_column(row, 1)?,
        writer_id: uuid_column(row, 2)?,
        text: row.get(3)?,
        private: row.get(4)?,
        written_at: datetime_column(row, 5)?,
    })
}
