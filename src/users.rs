//! User accounts, view grants and glycemic parameters.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::{check_viewable, require_doctor};
use crate::db::{self, DatabaseError, UserDetailsUpdate};
use crate::error::ServiceError;
use crate::models::{ExtraData, GlycemicRanges, GlycemicTargets, User, ViewableUser};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Registration input. Credentials are held by the authentication layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birthdate: Option<NaiveDate>,
    pub is_doctor: bool,
}

/// New extra-data values. Missing fields keep what was stored before.
#[derive(Debug, Clone, Default)]
pub struct ExtraDataUpdate {
    pub hba1c: Option<f64>,
    pub weight: Option<f64>,
    pub blood_pressure: Option<f64>,
}

fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim();
    if EMAIL_RE.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(ServiceError::InvalidInput("Invalid email".into()))
    }
}

fn validate_name(name: &str, field: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ServiceError::InvalidInput(format!("Missing {field}")))
    } else {
        Ok(name.to_string())
    }
}

fn map_email_conflict(err: DatabaseError) -> ServiceError {
    match err {
        DatabaseError::ConstraintViolation(_) => {
            ServiceError::InvalidInput("Email already in use".into())
        }
        other => other.into(),
    }
}

pub fn create_user(conn: &Connection, new: NewUser, now: NaiveDateTime) -> Result<User, ServiceError> {
    let user = User {
        id: Uuid::new_v4(),
        email: validate_email(&new.email)?,
        first_name: validate_name(&new.first_name, "first name")?,
        last_name: validate_name(&new.last_name, "last name")?,
        birthdate: new.birthdate,
        is_doctor: new.is_doctor,
        glycemic_ranges: None,
        glycemic_targets: None,
        extra_data: None,
        created_at: now,
    };
    db::insert_user(conn, &user).map_err(map_email_conflict)?;
    tracing::info!(user_id = %user.id, is_doctor = user.is_doctor, "User created");
    Ok(user)
}

fn to_viewable(user: User, today: NaiveDate) -> ViewableUser {
    ViewableUser {
        age: user.age_on(today),
        glycemic_ranges: user.glycemic_ranges.unwrap_or_default(),
        glycemic_targets: user.glycemic_targets.unwrap_or_default(),
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        extra_data: user.extra_data,
    }
}

/// Users `viewer` may read: itself first (unless a doctor), then granted patients.
pub fn list_viewable(
    conn: &Connection,
    viewer: &User,
    today: NaiveDate,
) -> Result<Vec<ViewableUser>, ServiceError> {
    let mut users = db::list_viewable_users(conn, &viewer.id)?;
    if let Some(pos) = users.iter().position(|u| u.id == viewer.id) {
        let own = users.remove(pos);
        users.insert(0, own);
    }
    Ok(users.into_iter().map(|u| to_viewable(u, today)).collect())
}

/// A single user record, subject to view access.
pub fn get_user(
    conn: &Connection,
    viewer: &User,
    target: Option<&Uuid>,
    today: NaiveDate,
) -> Result<ViewableUser, ServiceError> {
    let id = check_viewable(conn, viewer, target)?;
    let user = db::get_user(conn, &id)?
        .ok_or_else(|| ServiceError::NotFound("Invalid user".into()))?;
    Ok(to_viewable(user, today))
}

/// Give `doctor_id` read access to `patient_id`.
pub fn grant_view(
    conn: &Connection,
    doctor_id: &Uuid,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<(), ServiceError> {
    let doctor = db::get_user(conn, doctor_id)?
        .ok_or_else(|| ServiceError::NotFound("Invalid user".into()))?;
    let patient = db::get_user(conn, patient_id)?
        .ok_or_else(|| ServiceError::NotFound("Invalid user".into()))?;
    if !doctor.is_doctor {
        return Err(ServiceError::InvalidInput("Only doctors can be granted access".into()));
    }
    if patient.is_doctor {
        return Err(ServiceError::InvalidInput("Access can only be granted to patients".into()));
    }
    db::grant_viewable(conn, doctor_id, patient_id, &now)?;
    tracing::info!(doctor_id = %doctor_id, patient_id = %patient_id, "View access granted");
    Ok(())
}

/// Update the caller's own profile. Empty strings leave a field unchanged.
pub fn update_details(
    conn: &Connection,
    actor: &User,
    target: Option<&Uuid>,
    update: UserDetailsUpdate,
) -> Result<(), ServiceError> {
    if target.is_some_and(|id| *id != actor.id) {
        return Err(ServiceError::Forbidden("Can only update your own details".into()));
    }
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let update = UserDetailsUpdate {
        first_name: non_empty(update.first_name),
        last_name: non_empty(update.last_name),
        email: non_empty(update.email).map(|e| validate_email(&e)).transpose()?,
        birthdate: update.birthdate,
    };
    db::update_user_details(conn, &actor.id, &update).map_err(map_email_conflict)
}

/// Set a patient's ranges and/or targets. Doctors only; drops the patient's
/// cached summary so the next read recomputes with the new parameters.
pub fn update_glycemic_parameters(
    conn: &Connection,
    actor: &User,
    patient_id: &Uuid,
    ranges: Option<Vec<f64>>,
    targets: Option<Vec<f64>>,
) -> Result<(), ServiceError> {
    require_doctor(actor, "Only doctors can update glycemic parameters")?;
    let patient_id = check_viewable(conn, actor, Some(patient_id))?;

    let ranges = ranges.map(GlycemicRanges::try_from).transpose()?;
    let targets = targets.map(GlycemicTargets::try_from).transpose()?;
    if ranges.is_none() && targets.is_none() {
        return Err(ServiceError::InvalidInput("Nothing to update".into()));
    }

    db::set_glycemic_parameters(conn, &patient_id, ranges.as_ref(), targets.as_ref())?;
    db::delete_summary(conn, &patient_id)?;
    tracing::info!(patient_id = %patient_id, doctor_id = %actor.id, "Glycemic parameters updated");
    Ok(())
}

/// Merge new extra data over the caller's previous values.
pub fn update_extra_data(
    conn: &Connection,
    actor: &User,
    update: ExtraDataUpdate,
    now: NaiveDateTime,
) -> Result<ExtraData, ServiceError> {
    let values = [update.hba1c, update.weight, update.blood_pressure];
    if values.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ServiceError::InvalidInput("Invalid extra data".into()));
    }
    let previous = actor.extra_data.clone().unwrap_or_default();
    let merged = ExtraData {
        hba1c: update.hba1c.or(previous.hba1c),
        weight: update.weight.or(previous.weight),
        blood_pressure: update.blood_pressure.or(previous.blood_pressure),
        updated_at: Some(now),
    };
    db::set_extra_data(conn, &actor.id, &merged)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{SampleKind, Sample, SummaryCache};
    use std::collections::BTreeSet;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn new_user(email: &str, is_doctor: bool) -> NewUser {
        NewUser {
            email: email.into(),
            first_name: "Kim".into(),
            last_name: "Berg".into(),
            birthdate: NaiveDate::from_ymd_opt(1990, 6, 1),
            is_doctor,
        }
    }

    fn reload(conn: &Connection, id: &Uuid) -> User {
        db::get_user(conn, id).unwrap().unwrap()
    }

    #[test]
    fn create_rejects_bad_email_and_duplicates() {
        let conn = open_memory_database().unwrap();
        let bad = create_user(&conn, new_user("not-an-email", false), now());
        assert!(matches!(bad, Err(ServiceError::InvalidInput(_))));

        create_user(&conn, new_user("kim@example.com", false), now()).unwrap();
        let dup = create_user(&conn, new_user("KIM@example.com", false), now()).unwrap_err();
        assert_eq!(dup.to_string(), "Email already in use");
        assert_eq!(dup.status_code(), 400);
    }

    #[test]
    fn create_requires_names() {
        let conn = open_memory_database().unwrap();
        let mut input = new_user("kim@example.com", false);
        input.first_name = "  ".into();
        assert!(create_user(&conn, input, now()).is_err());
    }

    #[test]
    fn list_viewable_puts_self_first_with_defaults() {
        let conn = open_memory_database().unwrap();
        let other = create_user(&conn, new_user("a@example.com", false), now()).unwrap();
        let me = create_user(&conn, new_user("b@example.com", false), now()).unwrap();
        // A patient granted to another patient is unusual but allowed by the relation.
        db::grant_viewable(&conn, &me.id, &other.id, &now()).unwrap();

        let list = list_viewable(&conn, &me, now().date()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, me.id);
        assert_eq!(list[1].id, other.id);
        assert_eq!(list[0].age, Some(35));
        assert_eq!(list[0].glycemic_ranges, GlycemicRanges::default());
        assert_eq!(list[0].glycemic_targets, GlycemicTargets::default());
    }

    #[test]
    fn doctors_do_not_list_themselves() {
        let conn = open_memory_database().unwrap();
        let doctor = create_user(&conn, new_user("d@example.com", true), now()).unwrap();
        let patient = create_user(&conn, new_user("p@example.com", false), now()).unwrap();
        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();

        let list = list_viewable(&conn, &doctor, now().date()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, patient.id);
    }

    #[test]
    fn grant_view_requires_doctor_and_patient() {
        let conn = open_memory_database().unwrap();
        let doctor = create_user(&conn, new_user("d@example.com", true), now()).unwrap();
        let patient = create_user(&conn, new_user("p@example.com", false), now()).unwrap();
        assert!(grant_view(&conn, &patient.id, &doctor.id, now()).is_err());
        assert!(grant_view(&conn, &doctor.id, &doctor.id, now()).is_err());
        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();
        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();
        assert!(db::is_viewable(&conn, &doctor.id, &patient.id).unwrap());
    }

    #[test]
    fn get_user_respects_access() {
        let conn = open_memory_database().unwrap();
        let doctor = create_user(&conn, new_user("d@example.com", true), now()).unwrap();
        let patient = create_user(&conn, new_user("p@example.com", false), now()).unwrap();
        let err = get_user(&conn, &doctor, Some(&patient.id), now().date()).unwrap_err();
        assert_eq!(err.status_code(), 403);

        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();
        let seen = get_user(&conn, &doctor, Some(&patient.id), now().date()).unwrap();
        assert_eq!(seen.email, "p@example.com");
    }

    #[test]
    fn update_details_only_own_account() {
        let conn = open_memory_database().unwrap();
        let me = create_user(&conn, new_user("me@example.com", false), now()).unwrap();
        let other = create_user(&conn, new_user("o@example.com", false), now()).unwrap();

        let err = update_details(&conn, &me, Some(&other.id), UserDetailsUpdate::default()).unwrap_err();
        assert_eq!(err.status_code(), 403);

        update_details(
            &conn,
            &me,
            None,
            UserDetailsUpdate {
                first_name: Some("Mia".into()),
                last_name: Some("".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let stored = reload(&conn, &me.id);
        assert_eq!(stored.first_name, "Mia");
        assert_eq!(stored.last_name, "Berg");

        let taken = update_details(
            &conn,
            &me,
            Some(&me.id),
            UserDetailsUpdate {
                email: Some("o@example.com".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(taken.to_string(), "Email already in use");
    }

    #[test]
    fn glycemic_parameters_doctor_only_and_validated() {
        let conn = open_memory_database().unwrap();
        let doctor = create_user(&conn, new_user("d@example.com", true), now()).unwrap();
        let patient = create_user(&conn, new_user("p@example.com", false), now()).unwrap();

        let by_patient = update_glycemic_parameters(
            &conn, &patient, &patient.id, Some(vec![3.0, 4.0, 9.0, 12.0]), None,
        );
        assert_eq!(by_patient.unwrap_err().status_code(), 403);

        let not_granted = update_glycemic_parameters(
            &conn, &doctor, &patient.id, Some(vec![3.0, 4.0, 9.0, 12.0]), None,
        );
        assert_eq!(not_granted.unwrap_err().status_code(), 403);

        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();
        let unordered = update_glycemic_parameters(
            &conn, &doctor, &patient.id, Some(vec![3.0, 10.0, 9.0, 12.0]), None,
        );
        assert_eq!(unordered.unwrap_err().status_code(), 400);
        let out_of_range = update_glycemic_parameters(
            &conn, &doctor, &patient.id, None, Some(vec![0.1, 0.1, 1.5, 0.1, 0.1]),
        );
        assert_eq!(out_of_range.unwrap_err().status_code(), 400);
        let short = update_glycemic_parameters(&conn, &doctor, &patient.id, Some(vec![3.0]), None);
        assert!(short.is_err());

        update_glycemic_parameters(
            &conn, &doctor, &patient.id, Some(vec![3.0, 4.0, 9.0, 12.0]), None,
        )
        .unwrap();
        let stored = reload(&conn, &patient.id);
        assert_eq!(stored.glycemic_ranges.unwrap().boundaries(), &[3.0, 4.0, 9.0, 12.0]);
        assert!(stored.glycemic_targets.is_none());
    }

    #[test]
    fn parameter_update_invalidates_cached_summary() {
        let conn = open_memory_database().unwrap();
        let doctor = create_user(&conn, new_user("d@example.com", true), now()).unwrap();
        let patient = create_user(&conn, new_user("p@example.com", false), now()).unwrap();
        grant_view(&conn, &doctor.id, &patient.id, now()).unwrap();
        db::insert_sample(
            &conn,
            &Sample {
                patient_id: patient.id,
                kind: SampleKind::Cgm,
                recorded_at: now() - chrono::Duration::hours(1),
                value: 6.0,
            },
        )
        .unwrap();
        db::upsert_summary(
            &conn,
            &SummaryCache {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                time_of_day: vec![None; crate::models::SLOTS_PER_DAY],
                distribution: [0.0, 0.0, 1.0, 0.0, 0.0],
                problems: BTreeSet::new(),
                ttl: now() + chrono::Duration::hours(12),
                created_at: now(),
            },
        )
        .unwrap();

        update_glycemic_parameters(
            &conn, &doctor, &patient.id, None, Some(vec![0.0, 0.0, 0.9, 0.1, 0.0]),
        )
        .unwrap();
        assert!(db::get_summary(&conn, &patient.id).unwrap().is_none());
    }

    #[test]
    fn extra_data_merges_and_stamps() {
        let conn = open_memory_database().unwrap();
        let me = create_user(&conn, new_user("me@example.com", false), now()).unwrap();

        update_extra_data(
            &conn,
            &me,
            ExtraDataUpdate { hba1c: Some(6.8), weight: Some(70.0), blood_pressure: None },
            now(),
        )
        .unwrap();
        let me = reload(&conn, &me.id);

        let later = now() + chrono::Duration::days(30);
        let merged = update_extra_data(
            &conn,
            &me,
            ExtraDataUpdate { weight: Some(68.5), ..Default::default() },
            later,
        )
        .unwrap();
        assert_eq!(merged.hba1c, Some(6.8));
        assert_eq!(merged.weight, Some(68.5));
        assert_eq!(merged.blood_pressure, None);
        assert_eq!(merged.updated_at, Some(later));
        assert_eq!(reload(&conn, &me.id).extra_data, Some(merged));
    }

    #[test]
    fn extra_data_rejects_non_finite() {
        let conn = open_memory_database().unwrap();
        let me = create_user(&conn, new_user("me@example.com", false), now()).unwrap();
        let err = update_extra_data(
            &conn,
            &me,
            ExtraDataUpdate { weight: Some(f64::NAN), ..Default::default() },
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
