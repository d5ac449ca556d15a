//! Record access rules.
//!
//! 1. Own record → allowed
//! 2. Patient granted to the viewer (`viewable` table) → allowed
//! 3. Default → deny
//!
//! Doctor-only operations additionally check `User::is_doctor`.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceError;
use crate::models::User;

/// Resolve the requesting user handed over by the authentication layer.
pub fn load_actor(conn: &Connection, user_id: &Uuid) -> Result<User, ServiceError> {
    db::get_user(conn, user_id)?.ok_or_else(|| ServiceError::InvalidInput("Invalid user".into()))
}

/// The record `viewer` wants to read: its own when `target` is `None`,
/// otherwise `target` if it is the viewer or one of its granted patients.
pub fn check_viewable(
    conn: &Connection,
    viewer: &User,
    target: Option<&Uuid>,
) -> Result<Uuid, ServiceError> {
    let Some(target) = target else {
        return Ok(viewer.id);
    };
    if db::is_viewable(conn, &viewer.id, target)? {
        Ok(*target)
    } else {
        tracing::warn!(viewer_id = %viewer.id, target_id = %target, "Record access denied");
        Err(ServiceError::Forbidden("Not allowed to view this user".into()))
    }
}

pub fn require_doctor(actor: &User, message: &str) -> Result<(), ServiceError> {
    if actor.is_doctor {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(message.into()))
    }
}
