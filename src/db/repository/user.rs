use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use super::{datetime_column, format_datetime, json_column, map_row_error, uuid_column};
use crate::db::DatabaseError;
use crate::models::{ExtraData, GlycemicRanges, GlycemicTargets, User};

const USER_COLUMNS: &str = "id, email, first_name, last_name, birthdate, is_doctor,
     glycemic_ranges, glycemic_targets, extra_data, created_at";

/// Insert a user. A duplicate email (case-insensitive) is a constraint violation.
pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, birthdate, is_doctor,
                            glycemic_ranges, glycemic_targets, extra_data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user.id.to_string(),
            user.email,
            user.first_name,
            user.last_name,
            user.birthdate.map(|d| d.to_string()),
            user.is_doctor,
            user.glycemic_ranges.map(|r| serde_json::to_string(&r)).transpose()?,
            user.glycemic_targets.map(|t| serde_json::to_string(&t)).transpose()?,
            user.extra_data.as_ref().map(serde_json::to_string).transpose()?,
            format_datetime(&user.created_at),
        ],
    )
    .map_err(email_conflict)?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], row_to_user)
        .optional()
        .map_err(map_row_error)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    conn.query_row(&sql, params![email], row_to_user)
        .optional()
        .map_err(map_row_error)
}

/// The viewer itself plus every patient it was granted, doctors excluded,
/// in insertion order.
pub fn list_viewable_users(conn: &Connection, viewer_id: &Uuid) -> Result<Vec<User>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE is_doctor = 0
           AND (id = ?1 OR id IN (SELECT patient_id FROM viewable WHERE viewer_id = ?1))
         ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![viewer_id.to_string()], row_to_user)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_row_error)
}

/// Whether `viewer_id` may read the records of `patient_id`.
pub fn is_viewable(conn: &Connection, viewer_id: &Uuid, patient_id: &Uuid) -> Result<bool, DatabaseError> {
    if viewer_id == patient_id {
        return Ok(true);
    }
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM viewable WHERE viewer_id = ?1 AND patient_id = ?2",
            params![viewer_id.to_string(), patient_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Grant `viewer_id` read access to `patient_id`. Granting twice is a no-op.
pub fn grant_viewable(
    conn: &Connection,
    viewer_id: &Uuid,
    patient_id: &Uuid,
    granted_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO viewable (viewer_id, patient_id, granted_at) VALUES (?1, ?2, ?3)",
        params![
            viewer_id.to_string(),
            patient_id.to_string(),
            format_datetime(granted_at),
        ],
    )?;
    Ok(())
}

/// Fields of a user's own profile; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct UserDetailsUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

pub fn update_user_details(
    conn: &Connection,
    id: &Uuid,
    update: &UserDetailsUpdate,
) -> Result<(), DatabaseError> {
    let affected = conn
        .execute(
            "UPDATE users SET
                first_name = COALESCE(?2, first_name),
                last_name = COALESCE(?3, last_name),
                email = COALESCE(?4, email),
                birthdate = COALESCE(?5, birthdate)
             WHERE id = ?1",
            params![
                id.to_string(),
                update.first_name,
                update.last_name,
                update.email,
                update.birthdate.map(|d| d.to_string()),
            ],
        )
        .map_err(email_conflict)?;
    ensure_user_affected(affected, id)
}

/// Store glycemic parameters. `None` keeps the current value.
pub fn set_glycemic_parameters(
    conn: &Connection,
    id: &Uuid,
    ranges: Option<&GlycemicRanges>,
    targets: Option<&GlycemicTargets>,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE users SET
            glycemic_ranges = COALESCE(?2, glycemic_ranges),
            glycemic_targets = COALESCE(?3, glycemic_targets)
         WHERE id = ?1",
        params![
            id.to_string(),
            ranges.map(serde_json::to_string).transpose()?,
            targets.map(serde_json::to_string).transpose()?,
        ],
    )?;
    ensure_user_affected(affected, id)
}

pub fn set_extra_data(conn: &Connection, id: &Uuid, extra: &ExtraData) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE users SET extra_data = ?2 WHERE id = ?1",
        params![id.to_string(), serde_json::to_string(extra)?],
    )?;
    ensure_user_affected(affected, id)
}

fn ensure_user_affected(affected: usize, id: &Uuid) -> Result<(), DatabaseError> {
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn email_conflict(e: rusqlite::Error) -> DatabaseError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            DatabaseError::ConstraintViolation("email already in use".into())
        }
        _ => DatabaseError::Sqlite(e),
    }
}

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let birthdate: Option<String> = row.get(4)?;

    Ok(User {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        birthdate: birthdate.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        is_doctor: row.get(5)?,
        glycemic_ranges: json_column(row, 6)?,
        glycemic_targets: json_column(row, 7)?,
        extra_data: json_column(row, 8)?,
        created_at: datetime_column(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn make_user(email: &str, is_doctor: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            birthdate: NaiveDate::from_ymd_opt(1990, 3, 1),
            is_doctor,
            glycemic_ranges: None,
            glycemic_targets: None,
            extra_data: None,
            created_at: chrono::Local::now().naive_local(),
        }
    }

    #[test]
    fn insert_and_retrieve() {
        let conn = test_db();
        let user = make_user("patient@example.com", false);
        insert_user(&conn, &user).unwrap();

        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.email, "patient@example.com");
        assert_eq!(loaded.birthdate, NaiveDate::from_ymd_opt(1990, 3, 1));
        assert!(!loaded.is_doctor);
        assert!(loaded.glycemic_ranges.is_none());
    }

    #[test]
    fn email_lookup_ignores_case() {
        let conn = test_db();
        let user = make_user("Patient@Example.com", false);
        insert_user(&conn, &user).unwrap();

        let found = get_user_by_email(&conn, "patient@example.com").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn duplicate_email_is_constraint_violation() {
        let conn = test_db();
        insert_user(&conn, &make_user("dup@example.com", false)).unwrap();
        let result = insert_user(&conn, &make_user("DUP@example.com", false));
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn viewable_list_excludes_doctors_and_strangers() {
        let conn = test_db();
        let doctor = make_user("doc@example.com", true);
        let p1 = make_user("p1@example.com", false);
        let p2 = make_user("p2@example.com", false);
        let stranger = make_user("p3@example.com", false);
        for u in [&doctor, &p1, &p2, &stranger] {
            insert_user(&conn, u).unwrap();
        }
        let now = chrono::Local::now().naive_local();
        grant_viewable(&conn, &doctor.id, &p1.id, &now).unwrap();
        grant_viewable(&conn, &doctor.id, &p2.id, &now).unwrap();
        grant_viewable(&conn, &doctor.id, &p2.id, &now).unwrap();

        let ids: Vec<Uuid> = list_viewable_users(&conn, &doctor.id)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![p1.id, p2.id]);

        let own: Vec<Uuid> = list_viewable_users(&conn, &p1.id)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(own, vec![p1.id]);
    }

    #[test]
    fn is_viewable_covers_self_and_grants() {
        let conn = test_db();
        let doctor = make_user("doc@example.com", true);
        let patient = make_user("p@example.com", false);
        insert_user(&conn, &doctor).unwrap();
        insert_user(&conn, &patient).unwrap();

        assert!(is_viewable(&conn, &patient.id, &patient.id).unwrap());
        assert!(!is_viewable(&conn, &doctor.id, &patient.id).unwrap());

        grant_viewable(&conn, &doctor.id, &patient.id, &chrono::Local::now().naive_local()).unwrap();
        assert!(is_viewable(&conn, &doctor.id, &patient.id).unwrap());
        assert!(!is_viewable(&conn, &patient.id, &doctor.id).unwrap());
    }

    #[test]
    fn glycemic_parameters_update_independently() {
        let conn = test_db();
        let user = make_user("p@example.com", false);
        insert_user(&conn, &user).unwrap();

        let ranges = GlycemicRanges::new([3.5, 4.0, 9.0, 12.0]).unwrap();
        set_glycemic_parameters(&conn, &user.id, Some(&ranges), None).unwrap();
        let targets = GlycemicTargets::new([0.02, 0.05, 0.6, 0.3, 0.1]).unwrap();
        set_glycemic_parameters(&conn, &user.id, None, Some(&targets)).unwrap();

        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.glycemic_ranges, Some(ranges));
        assert_eq!(loaded.glycemic_targets, Some(targets));
    }

    #[test]
    fn malformed_stored_ranges_surface_as_constraint_violation() {
        let conn = test_db();
        let user = make_user("p@example.com", false);
        insert_user(&conn, &user).unwrap();
        conn.execute(
            "UPDATE users SET glycemic_ranges = '[1.0, 2.0]' WHERE id = ?1",
            params![user.id.to_string()],
        )
        .unwrap();

        let result = get_user(&conn, &user.id);
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn details_update_keeps_unset_fields() {
        let conn = test_db();
        let user = make_user("p@example.com", false);
        insert_user(&conn, &user).unwrap();

        update_user_details(
            &conn,
            &user.id,
            &UserDetailsUpdate {
                first_name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let loaded = get_user(&conn, &user.id).unwrap().unwrap();
        assert_eq!(loaded.first_name, "Renamed");
        assert_eq!(loaded.last_name, "User");
        assert_eq!(loaded.email, "p@example.com");
    }

    #[test]
    fn update_missing_user_fails() {
        let conn = test_db();
        let result = set_extra_data(&conn, &Uuid::new_v4(), &ExtraData::default());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
