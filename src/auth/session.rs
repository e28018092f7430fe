use actix_session::Session;

use crate::errors::AppError;

/// The identity provider sitting in front of this service writes the
/// authenticated user id into the session cookie at login. This module only
/// reads it back; no credentials are handled here.
pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

/// Require an authenticated user; returns Err(Unauthorized) if absent.
/// There is no guest identity — every write operation needs a real user id.
pub fn require_user(session: &Session) -> Result<i64, AppError> {
    get_user_id(session).ok_or(AppError::Unauthorized)
}
